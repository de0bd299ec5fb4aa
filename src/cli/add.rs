use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use indicatif::ProgressBar;

use crate::IMDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{Opts, OrbOptions};
use crate::orb::ORBDetector;
use crate::scan::{DEFAULT_SUFFIX, ImageScanner};
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    #[command(flatten)]
    pub orb: OrbOptions,
    /// 图片所在目录
    pub path: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = DEFAULT_SUFFIX)]
    pub suffix: String,
    /// 同时扫描子目录
    #[arg(short, long)]
    pub recursive: bool,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let scanner = ImageScanner::new(&self.path, &self.suffix)?.recursive(self.recursive);
        let orb = ORBDetector::create(self.orb.clone());

        let db = IMDBBuilder::new(opts.conf_dir.clone()).open().await?;
        let pb = ProgressBar::no_length().with_style(pb_style());
        let result = db.add_directory(&scanner, &orb, &pb).await;
        db.close().await;

        let summary = match result {
            Ok(summary) => summary,
            Err(e) => {
                pb.abandon_with_message("图片添加失败");
                return Err(e.into());
            }
        };
        pb.finish_with_message("图片添加完成");
        println!(
            "added: {}, updated: {}, decode failed: {}, no features: {}, write failed: {}",
            summary.added, summary.updated, summary.decode_failed, summary.no_features, summary.write_failed
        );
        Ok(())
    }
}
