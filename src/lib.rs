/*!
lsp_tools derives land surface parameters (hillshade, slope, topographic
wetness index, topographic position index, relative elevation and potential
incoming solar radiation) from digital elevation models.

The numerical work is done by a small tool engine (`tools::ToolManager`)
whose tools are run by name with command-style argument lists. The `lsp`
module sequences those tools into a single workflow, `lsp::compute_lsps`.
*/

pub mod configs;
pub mod lsp;
pub mod raster;
pub mod structures;
pub mod tools;
pub mod utils;
