use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::{IMDB, Opts};

#[derive(Parser, Debug, Clone)]
pub struct CleanCommand {}

impl SubCommandExtend for CleanCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        if !opts.conf_dir.database().exists() {
            info!("数据库不存在，无需清理");
            return Ok(());
        }
        info!("删除数据库中……");
        IMDB::destroy_files(&opts.conf_dir)?;
        println!("Database cleared!");
        Ok(())
    }
}
