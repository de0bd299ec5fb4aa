use futures::stream::BoxStream;
use sqlx::{Executor, Result, Sqlite, SqlitePool};

use super::{FaceRecord, UpsertOutcome};

/// 检查图片路径是否已存在
pub async fn check_image_path<'c, E>(executor: E, path: &str) -> Result<bool>
where
    E: Executor<'c, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        SELECT COUNT(*) FROM face_features WHERE image_path = ?
        "#,
    )
    .bind(path)
    .fetch_one(executor)
    .await?;

    Ok(count > 0)
}

/// 插入或替换图片特征，路径已存在时保留原有 ID
pub async fn upsert_face(
    executor: &SqlitePool,
    path: &str,
    feature_vector: &[u8],
    name: Option<&str>,
) -> Result<UpsertOutcome> {
    let mut tx = executor.begin().await?;
    let exists = check_image_path(&mut *tx, path).await?;
    sqlx::query(
        r#"
        INSERT INTO face_features (image_path, feature_vector, name)
        VALUES (?, ?, ?)
        ON CONFLICT (image_path) DO UPDATE SET
            feature_vector = excluded.feature_vector,
            name = excluded.name
        "#,
    )
    .bind(path)
    .bind(feature_vector)
    .bind(name)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(if exists { UpsertOutcome::Updated } else { UpsertOutcome::Inserted })
}

/// 按 ID 顺序逐条读取所有记录
pub fn stream_faces(executor: &SqlitePool) -> BoxStream<'_, Result<FaceRecord>> {
    sqlx::query_as::<Sqlite, FaceRecord>(
        r#"
        SELECT id, image_path, feature_vector, name FROM face_features ORDER BY id ASC
        "#,
    )
    .fetch(executor)
}

/// 根据路径获取记录
pub async fn get_face(executor: &SqlitePool, path: &str) -> Result<Option<FaceRecord>> {
    sqlx::query_as::<Sqlite, FaceRecord>(
        r#"
        SELECT id, image_path, feature_vector, name FROM face_features WHERE image_path = ?
        "#,
    )
    .bind(path)
    .fetch_optional(executor)
    .await
}

/// 查询数据库中的记录数量
pub async fn count_faces(executor: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar::<Sqlite, i64>(r#"SELECT COUNT(*) FROM face_features"#).fetch_one(executor).await
}
