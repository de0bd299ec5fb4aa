use rayon::prelude::*;
use serde::Serialize;

use crate::descriptor::Descriptor;
use crate::matcher::{DMatch, cross_check_match};

/// 计算相似度时使用的最佳匹配数量
pub const BEST_MATCHES: usize = 10;

/// 一条可以参与比较的图库记录
#[derive(Debug, Clone, PartialEq)]
pub struct FaceEntry {
    pub image_path: String,
    pub name: Option<String>,
    pub descriptors: Vec<Descriptor>,
}

/// 单条比较结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub image_path: String,
    pub name: Option<String>,
    /// 相似度，不小于 0
    pub similarity: f32,
    /// 互为最近邻的匹配数量
    pub matches: usize,
}

/// 根据匹配结果计算相似度
///
/// 取距离最小的 min(10, n) 个匹配的平均距离 d，相似度为 max(0, 100 - d)。
/// 没有任何匹配时相似度为 0。
pub fn similarity(matches: &mut [DMatch]) -> f32 {
    if matches.is_empty() {
        return 0.;
    }
    matches.sort_by_key(|m| m.distance);
    let best = &matches[..matches.len().min(BEST_MATCHES)];
    let total: u32 = best.iter().map(|m| m.distance).sum();
    let average = total as f32 / best.len() as f32;
    (100. - average).max(0.)
}

/// 计算查询描述符与单条记录的比较结果
pub fn score(query: &[Descriptor], entry: &FaceEntry) -> MatchResult {
    let mut matches = cross_check_match(query, &entry.descriptors);
    MatchResult {
        image_path: entry.image_path.clone(),
        name: entry.name.clone(),
        similarity: similarity(&mut matches),
        matches: matches.len(),
    }
}

/// 将查询描述符与图库中的每条记录比较，按相似度降序返回前 top_n 条
///
/// 有匹配的记录总是排在没有匹配的记录之前，相似度相同时保持图库原有顺序。
pub fn rank(query: &[Descriptor], entries: &[FaceEntry], top_n: usize) -> Vec<MatchResult> {
    if query.is_empty() || top_n == 0 {
        return vec![];
    }

    // collect 会保持 entries 的原有顺序
    let mut results = entries.par_iter().map(|entry| score(query, entry)).collect::<Vec<_>>();
    results.sort_by(|a, b| {
        (b.matches > 0)
            .cmp(&(a.matches > 0))
            .then_with(|| b.similarity.total_cmp(&a.similarity))
    });
    results.truncate(top_n);
    results
}
