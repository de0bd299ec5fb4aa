use thiserror::Error;

use crate::descriptor::DESCRIPTOR_SIZE;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// 图片无法解码
    #[error("无法解码图片 {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    /// 路径不是合法的 UTF-8，无法作为记录的键
    #[error("图片路径不是合法的 UTF-8: {0}")]
    InvalidPath(String),
    /// 解码成功，但没有检测到任何特征点
    #[error("图片中没有检测到特征点: {0}")]
    NoFeatures(String),
    /// 写入数据库失败
    #[error("写入数据库失败 {path}: {source}")]
    StoreWrite {
        path: String,
        #[source]
        source: sqlx::Error,
    },
    /// 读取数据库失败
    #[error("读取数据库失败: {0}")]
    StoreRead(#[from] sqlx::Error),
    /// 特征向量长度不是描述符宽度的整数倍
    #[error("记录已损坏 {path}: 特征向量长度 {len} 不是 {DESCRIPTOR_SIZE} 的整数倍")]
    CorruptRecord { path: String, len: usize },
    #[error("数据库迁移失败: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("特征提取任务失败: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// 单个条目的错误，批量处理时应当跳过而不是中止
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. }
                | Self::InvalidPath(_)
                | Self::NoFeatures(_)
                | Self::StoreWrite { .. }
                | Self::CorruptRecord { .. }
        )
    }

    /// 图片本身没有可用的特征（无法解码或没有特征点）
    pub fn is_no_features(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::NoFeatures(_))
    }
}
