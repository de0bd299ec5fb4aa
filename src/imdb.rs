use std::path::Path;
use std::time::Instant;

use futures::TryStreamExt;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::ConfDir;
use crate::db::{self, Database, FaceRecord, UpsertOutcome, crud};
use crate::descriptor::{self, Descriptor};
use crate::error::{Error, Result};
use crate::orb::ORBDetector;
use crate::ranker::{self, FaceEntry, MatchResult};
use crate::scan::{ImageScanner, display_name};

pub struct IMDBBuilder {
    conf_dir: ConfDir,
    wal: bool,
}

impl IMDBBuilder {
    pub fn new(conf_dir: ConfDir) -> Self {
        Self { conf_dir, wal: true }
    }

    /// 是否使用 WAL 模式
    pub fn wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }

    pub async fn open(self) -> Result<IMDB> {
        if !self.conf_dir.path().exists() {
            std::fs::create_dir_all(self.conf_dir.path())?;
        }
        let db = db::init_db(self.conf_dir.database(), self.wal).await?;
        Ok(IMDB { conf_dir: self.conf_dir, db })
    }
}

/// 数据库会话
///
/// 每个工作单元打开一次，结束时调用 [`IMDB::close`]
pub struct IMDB {
    conf_dir: ConfDir,
    db: Database,
}

/// 批量添加图片的统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub added: usize,
    pub updated: usize,
    pub decode_failed: usize,
    pub no_features: usize,
    pub write_failed: usize,
}

impl LoadSummary {
    pub fn skipped(&self) -> usize {
        self.decode_failed + self.no_features + self.write_failed
    }
}

/// 一次搜索的结果
#[derive(Debug, Default, Clone, Serialize)]
pub struct SearchReport {
    /// 按相似度降序排列的结果
    pub matches: Vec<MatchResult>,
    /// 已损坏而被跳过的记录路径
    pub corrupt: Vec<String>,
}

impl IMDB {
    /// 写入一张图片的描述符，已存在的路径会被覆盖
    ///
    /// 描述符为空时不会写入数据库
    pub async fn upsert(&self, path: &str, descriptors: &[Descriptor], name: Option<&str>) -> Result<UpsertOutcome> {
        if descriptors.is_empty() {
            return Err(Error::NoFeatures(path.to_string()));
        }
        crud::upsert_face(&self.db, path, descriptor::to_bytes(descriptors), name)
            .await
            .map_err(|source| Error::StoreWrite { path: path.to_string(), source })
    }

    /// 提取图片特征并写入数据库，文件名（不含后缀）作为显示名称
    ///
    /// 路径就是记录的键，因此必须是合法的 UTF-8
    pub async fn add_image(&self, path: impl AsRef<Path>, orb: &ORBDetector) -> Result<UpsertOutcome> {
        let path = path.as_ref();
        let Some(key) = path.to_str() else {
            return Err(Error::InvalidPath(path.display().to_string()));
        };
        let des = extract(path, orb).await?;
        let name = display_name(path);
        self.upsert(key, &des, name.as_deref()).await
    }

    /// 依次添加所有图片，单张图片的失败只会被记录并跳过
    ///
    /// 其他错误（例如提取任务崩溃）会中止整个批次
    pub async fn add_images<I>(&self, paths: I, orb: &ORBDetector, pb: &ProgressBar) -> Result<LoadSummary>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        let mut summary = LoadSummary::default();
        for path in paths {
            let path = path.as_ref();
            match self.add_image(path, orb).await {
                Ok(UpsertOutcome::Inserted) => {
                    summary.added += 1;
                    pb.set_message(format!("添加: {}", path.display()));
                }
                Ok(UpsertOutcome::Updated) => {
                    summary.updated += 1;
                    pb.set_message(format!("更新: {}", path.display()));
                }
                Err(e) if e.is_skippable() => {
                    match &e {
                        Error::Decode { .. } | Error::InvalidPath(_) => summary.decode_failed += 1,
                        Error::NoFeatures(_) => summary.no_features += 1,
                        _ => summary.write_failed += 1,
                    }
                    warn!("跳过 {}: {}", path.display(), e);
                }
                Err(e) => return Err(e),
            }
            pb.inc(1);
        }
        Ok(summary)
    }

    /// 扫描目录并添加其中的所有图片
    pub async fn add_directory(
        &self,
        scanner: &ImageScanner,
        orb: &ORBDetector,
        pb: &ProgressBar,
    ) -> Result<LoadSummary> {
        if !scanner.root().is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("目录不存在: {}", scanner.root().display()),
            )
            .into());
        }

        info!("开始扫描目录: {}", scanner.root().display());
        let paths = scanner.iter().collect::<Vec<_>>();
        info!("扫描完成，共 {} 张图片", paths.len());
        pb.set_length(paths.len() as u64);

        let summary = self.add_images(paths, orb, pb).await?;
        info!(
            "已从 {} 加载图片特征：新增 {}，更新 {}，跳过 {}",
            scanner.root().display(),
            summary.added,
            summary.updated,
            summary.skipped()
        );
        Ok(summary)
    }

    /// 读取所有记录
    ///
    /// 外层错误表示数据库读取失败，内层错误表示单条记录已损坏
    pub async fn load_all(&self) -> Result<Vec<Result<FaceEntry>>> {
        let records = crud::stream_faces(&self.db).map_ok(decode_record).try_collect::<Vec<_>>().await?;
        Ok(records)
    }

    /// 用描述符搜索最相似的 top_n 张图片
    pub async fn search_des(&self, query: &[Descriptor], top_n: usize) -> Result<SearchReport> {
        if query.is_empty() {
            return Ok(SearchReport::default());
        }

        let instant = Instant::now();
        let mut entries = vec![];
        let mut corrupt = vec![];
        for record in self.load_all().await? {
            match record {
                Ok(entry) => entries.push(entry),
                Err(Error::CorruptRecord { path, len }) => {
                    warn!("跳过已损坏的记录 {}: 长度 {}", path, len);
                    corrupt.push(path);
                }
                Err(e) => return Err(e),
            }
        }
        debug!("读取 {} 条记录耗时 {:.2}ms", entries.len(), instant.elapsed().as_secs_f32() * 1000.);

        let instant = Instant::now();
        let matches = ranker::rank(query, &entries, top_n);
        debug!("比较 {} 条记录耗时 {:.2}ms", entries.len(), instant.elapsed().as_secs_f32() * 1000.);

        Ok(SearchReport { matches, corrupt })
    }

    /// 在数据库中搜索一张图片
    ///
    /// 图片无法解码或没有特征点时返回 [`Error::Decode`] 或 [`Error::NoFeatures`]，
    /// 此时不会读取数据库
    pub async fn search(&self, image_path: impl AsRef<Path>, orb: &ORBDetector, top_n: usize) -> Result<SearchReport> {
        let image_path = image_path.as_ref();
        let des = extract(image_path, orb).await?;
        if des.is_empty() {
            return Err(Error::NoFeatures(image_path.display().to_string()));
        }
        debug!("查询图片包含 {} 个描述符", des.len());
        self.search_des(&des, top_n).await
    }

    pub async fn get(&self, path: &str) -> Result<Option<FaceEntry>> {
        match crud::get_face(&self.db, path).await? {
            Some(record) => decode_record(record).map(Some),
            None => Ok(None),
        }
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(crud::count_faces(&self.db).await? as u64)
    }

    /// 关闭数据库连接，可以重复调用
    pub async fn close(&self) {
        if !self.db.is_closed() {
            self.db.close().await;
            info!("数据库连接已关闭");
        }
    }

    /// 关闭连接并删除数据库文件
    pub async fn destroy(self) -> Result<()> {
        self.close().await;
        Self::destroy_files(&self.conf_dir)
    }

    /// 直接删除数据库文件及 WAL 文件，数据库损坏时也能使用
    ///
    /// 调用前必须确保没有打开的会话
    pub fn destroy_files(conf_dir: &ConfDir) -> Result<()> {
        let database = conf_dir.database();
        for suffix in ["", "-wal", "-shm"] {
            let mut file = database.clone().into_os_string();
            file.push(suffix);
            match std::fs::remove_file(&file) {
                Ok(()) => debug!("已删除 {}", Path::new(&file).display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!("数据库已删除: {}", database.display());
        Ok(())
    }
}

/// 在阻塞线程池中提取图片特征
async fn extract(path: &Path, orb: &ORBDetector) -> Result<Vec<Descriptor>> {
    let (orb, path) = (orb.clone(), path.to_path_buf());
    let (_, _, des) = tokio::task::spawn_blocking(move || orb.detect_file(path)).await??;
    Ok(des)
}

fn decode_record(record: FaceRecord) -> Result<FaceEntry> {
    match descriptor::from_bytes(&record.feature_vector) {
        Some(descriptors) => Ok(FaceEntry {
            image_path: record.image_path,
            name: record.name,
            descriptors: descriptors.to_vec(),
        }),
        None => Err(Error::CorruptRecord { path: record.image_path, len: record.feature_vector.len() }),
    }
}
