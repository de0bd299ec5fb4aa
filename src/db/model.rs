use sqlx::FromRow;

/// 图片特征记录，对应 `face_features` 表
#[derive(Debug, Clone, FromRow)]
pub struct FaceRecord {
    /// 自增 ID，仅用于保持遍历顺序
    pub id: i64,
    /// 图片路径，唯一
    pub image_path: String,
    /// 所有描述符按顺序拼接，长度为 count * 32
    pub feature_vector: Vec<u8>,
    /// 显示名称
    pub name: Option<String>,
}

/// 写入记录的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}
