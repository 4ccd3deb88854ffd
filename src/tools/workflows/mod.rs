// private sub-module defined in other files
mod land_surface_parameters;

// exports identifiers from private sub-modules in the current module namespace
pub use self::land_surface_parameters::LandSurfaceParameters;
