use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, OrbOptions, OutputFormat};
use crate::matcher::cross_check_match;
use crate::orb::ORBDetector;
use crate::ranker::similarity;

#[derive(Parser, Debug, Clone)]
pub struct MatchCommand {
    #[command(flatten)]
    pub orb: OrbOptions,
    /// 图片1
    pub image1: PathBuf,
    /// 图片2
    pub image2: PathBuf,
    /// 输出格式
    #[arg(long, value_enum, value_name = "FORMAT", default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for MatchCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let orb = ORBDetector::create(self.orb.clone());
        let (des1, des2) = block_in_place(|| -> Result<_> {
            let (_, _, des1) = orb.detect_file(&self.image1)?;
            let (_, _, des2) = orb.detect_file(&self.image2)?;
            Ok((des1, des2))
        })?;

        let mut matches = cross_check_match(&des1, &des2);
        let score = similarity(&mut matches);

        match self.output_format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "descriptors": [des1.len(), des2.len()],
                    "matches": matches.len(),
                    "similarity": score,
                }))?
            ),
            OutputFormat::Table => {
                println!("descriptors\t{}\t{}", des1.len(), des2.len());
                println!("matches\t{}", matches.len());
                println!("similarity\t{:.2}", score);
            }
        }
        Ok(())
    }
}
