pub mod codeforces;
pub mod definition;
pub mod request;
pub mod utils;

pub use codeforces::Client;
pub use definition::{Info, ProblemType};
pub use request::{HttpSession, Session};
pub use utils::{CodeforcesPage, Extractor};
