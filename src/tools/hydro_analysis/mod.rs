// private sub-module defined in other files
mod fill_depressions;
mod flow_accumulation;
mod specific_catchment_area;

// exports identifiers from private sub-modules in the current module namespace
pub use self::fill_depressions::FillDepressions;
pub use self::flow_accumulation::FlowAccumulation;
pub use self::specific_catchment_area::SpecificCatchmentArea;
