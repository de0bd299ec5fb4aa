mod add;
mod clean;
mod r#match;
mod search;

pub use add::*;
pub use clean::*;
pub use r#match::*;
pub use search::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
