use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::warn;

use crate::IMDBBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{Opts, OrbOptions, OutputFormat, SearchOptions};
use crate::imdb::SearchReport;
use crate::orb::ORBDetector;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub orb: OrbOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 被搜索的草图路径
    pub image: PathBuf,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let orb = ORBDetector::create(self.orb.clone());

        let db = IMDBBuilder::new(opts.conf_dir.clone()).open().await?;
        let result = db.search(&self.image, &orb, self.search.count).await;
        db.close().await;

        let report = match result {
            Ok(report) => report,
            Err(e) if e.is_no_features() => {
                warn!("查询图片没有可用的特征: {}", e);
                SearchReport::default()
            }
            Err(e) => return Err(e.into()),
        };
        for path in &report.corrupt {
            warn!("已跳过损坏的记录: {}", path);
        }

        print_result(&report, self.search.output_format)
    }
}

fn print_result(report: &SearchReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report.matches)?)
        }
        OutputFormat::Table => {
            for m in &report.matches {
                println!("{:.2}\t{}\t{}", m.similarity, m.name.as_deref().unwrap_or("-"), m.image_path);
            }
        }
    }
    Ok(())
}
