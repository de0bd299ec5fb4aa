use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;
use image::imageops::FilterType;

use crate::cli::*;
use crate::orb::is_valid_scale_factor;

static CONF_DIR: LazyLock<String> = LazyLock::new(|| {
    ProjectDirs::from("", "sketchsearch", "sketchsearch")
        .map(|dirs| dirs.config_dir().to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string())
});

fn default_config_dir() -> &'static str {
    CONF_DIR.as_str()
}

#[derive(Parser, Debug, Clone)]
pub struct OrbOptions {
    /// ORB 特征点最大保留数量
    #[arg(short = 'n', value_name = "N", long, default_value_t = 500)]
    pub orb_nfeatures: u32,
    /// ORB 特征金字塔缩放因子
    #[arg(long, value_name = "SCALE", default_value_t = 1.2, value_parser = parse_scale_factor)]
    pub orb_scale_factor: f32,
    /// ORB 特征金字塔层数
    #[arg(long, value_name = "N", default_value_t = 8)]
    pub orb_nlevels: u32,
    /// FAST 角点检测阈值
    #[arg(long, value_name = "THRESHOLD", default_value_t = 20)]
    pub orb_fast_threshold: u8,
    /// 图片缩放插值方式
    #[arg(long, value_name = "FLAG", default_value = "triangle", value_parser = parse_interpolation)]
    pub orb_interpolation: FilterType,
    /// 图片最大尺寸，宽或高超过这个尺寸时等比缩小
    #[arg(short = 'S', long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, default_value = "1920x1080")]
    pub max_size: (u32, u32),
}

impl Default for OrbOptions {
    fn default() -> Self {
        Self {
            orb_nfeatures: 500,
            orb_scale_factor: 1.2,
            orb_nlevels: 8,
            orb_fast_threshold: 20,
            orb_interpolation: FilterType::Triangle,
            max_size: (1920, 1080),
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 显示的结果数量
    #[arg(long, value_name = "COUNT", default_value_t = 5)]
    pub count: usize,
    /// 输出格式
    #[arg(long, value_enum, value_name = "FORMAT", default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "sketchsearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 配置文件目录，数据库保存在这里
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 提取目录中图片的特征并保存到数据库
    Add(AddCommand),
    /// 用一张草图搜索数据库中最相似的图片
    Search(SearchCommand),
    /// 直接比较两张图片
    Match(MatchCommand),
    /// 删除整个数据库
    Clean(CleanCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("face_database.db")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

fn parse_size(s: &str) -> anyhow::Result<(u32, u32)> {
    let Some((width, height)) = s.split_once('x') else {
        return Err(anyhow::anyhow!("无效的尺寸: {}", s));
    };
    Ok((width.parse()?, height.parse()?))
}

fn parse_scale_factor(s: &str) -> anyhow::Result<f32> {
    let scale: f32 = s.parse()?;
    if !is_valid_scale_factor(scale) {
        return Err(anyhow::anyhow!("缩放因子必须大于 1: {}", s));
    }
    Ok(scale)
}

fn parse_interpolation(s: &str) -> Result<FilterType, String> {
    match s {
        "nearest" => Ok(FilterType::Nearest),
        "triangle" => Ok(FilterType::Triangle),
        "catmullrom" => Ok(FilterType::CatmullRom),
        "gaussian" => Ok(FilterType::Gaussian),
        "lanczos3" => Ok(FilterType::Lanczos3),
        _ => Err(format!("无效的插值方式: {}", s)),
    }
}
