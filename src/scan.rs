use std::path::{Path, PathBuf};

use log::warn;
use regex::Regex;
use walkdir::WalkDir;

/// 默认扫描的图片后缀名
pub const DEFAULT_SUFFIX: &str = "jpg,jpeg,png,bmp";

/// 扫描目录中的图片文件
///
/// 每次调用 [`ImageScanner::iter`] 都会重新遍历目录，结果按文件名排序
#[derive(Debug, Clone)]
pub struct ImageScanner {
    root: PathBuf,
    suffix: Regex,
    recursive: bool,
}

impl ImageScanner {
    /// `suffix` 为逗号分隔的后缀名列表，不区分大小写
    pub fn new(root: impl Into<PathBuf>, suffix: &str) -> Result<Self, regex::Error> {
        let alternatives = suffix
            .split(',')
            .map(|s| regex::escape(s.trim().trim_start_matches('.')))
            .collect::<Vec<_>>()
            .join("|");
        let suffix = Regex::new(&format!("(?i)^({})$", alternatives))?;
        Ok(Self { root: root.into(), suffix, recursive: false })
    }

    /// 是否扫描子目录
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_image(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| self.suffix.is_match(&ext.to_string_lossy()))
    }

    pub fn iter(&self) -> impl Iterator<Item = PathBuf> + '_ {
        let walker = WalkDir::new(&self.root).sort_by_file_name();
        let walker = if self.recursive { walker } else { walker.max_depth(1) };
        walker
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("扫描目录出错: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.is_image(entry.path()))
            .map(|entry| entry.into_path())
    }
}

/// 图片的显示名称：去掉后缀名的文件名
pub fn display_name(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn filter_by_suffix_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.JPG", "a.png", "c.jpeg", "d.bmp", "e.gif", "f.txt", "noext", "g.PnG"] {
            touch(dir.path(), name);
        }
        let scanner = ImageScanner::new(dir.path(), DEFAULT_SUFFIX).unwrap();
        let names = scanner
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, ["a.png", "b.JPG", "c.jpeg", "d.bmp", "g.PnG"]);
    }

    #[test]
    fn recursive_scan() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(dir.path(), "top.png");
        touch(&dir.path().join("sub"), "nested.png");

        let scanner = ImageScanner::new(dir.path(), "png").unwrap();
        assert_eq!(scanner.iter().count(), 1);
        let scanner = scanner.recursive(true);
        assert_eq!(scanner.iter().count(), 2);
        // 可以重复遍历
        assert_eq!(scanner.iter().count(), 2);
    }

    #[test]
    fn suffix_is_not_a_substring_match() {
        let scanner = ImageScanner::new(".", "jpg,.png").unwrap();
        assert!(scanner.is_image(Path::new("x.jpg")));
        assert!(scanner.is_image(Path::new("x.png")));
        assert!(!scanner.is_image(Path::new("x.jpgx")));
        assert!(!scanner.is_image(Path::new("x.apng")));
    }

    #[test]
    fn name_without_extension() {
        assert_eq!(display_name(Path::new("/a/b/alice.smith.jpg")).as_deref(), Some("alice.smith"));
    }
}
