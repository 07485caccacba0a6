pub mod posters;
pub mod presets;
pub mod system;
pub mod themes;

pub mod utils;
