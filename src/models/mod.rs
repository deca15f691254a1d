pub mod chat;
mod de;
pub mod enums;
pub mod history;
pub mod profile;
pub mod report;
pub mod upload;

pub use chat::*;
pub use enums::*;
pub use history::*;
pub use profile::*;
pub use report::*;
pub use upload::*;
