use crate::descriptor::Descriptor;
use crate::hamming::batch_nearest;

/// 一对互为最近邻的描述符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DMatch {
    /// 查询描述符的索引
    pub query_idx: usize,
    /// 库中描述符的索引
    pub train_idx: usize,
    /// 汉明距离
    pub distance: u32,
}

/// 交叉验证的暴力匹配
///
/// 分别计算 query -> train 和 train -> query 的最近邻，只保留双方互为最近邻的配对。
/// 结果按 query 索引排列。
pub fn cross_check_match(query: &[Descriptor], train: &[Descriptor]) -> Vec<DMatch> {
    if query.is_empty() || train.is_empty() {
        return vec![];
    }

    let forward = batch_nearest(query, train);
    let backward = batch_nearest(train, query);

    forward
        .into_iter()
        .enumerate()
        .filter_map(|(query_idx, best)| {
            let (train_idx, distance) = best?;
            match backward[train_idx] {
                Some((back, _)) if back == query_idx => Some(DMatch { query_idx, train_idx, distance }),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_bits(n: usize) -> Descriptor {
        let mut d = [0u8; 32];
        for i in 0..n {
            d[i / 8] |= 1 << (i % 8);
        }
        d
    }

    #[test]
    fn empty_side_yields_nothing() {
        assert!(cross_check_match(&[], &[[0; 32]]).is_empty());
        assert!(cross_check_match(&[[0; 32]], &[]).is_empty());
    }

    #[test]
    fn one_directional_nearest_is_rejected() {
        // q0 和 q1 的最近邻都是 t0，但 t0 只认 q0
        let query = [with_bits(0), with_bits(4)];
        let train = [with_bits(1), with_bits(200)];
        let matches = cross_check_match(&query, &train);
        assert_eq!(matches, vec![DMatch { query_idx: 0, train_idx: 0, distance: 1 }]);
    }

    #[test]
    fn identical_sets_match_fully() {
        let set = [with_bits(0), with_bits(64), with_bits(128), with_bits(256)];
        let matches = cross_check_match(&set, &set);
        assert_eq!(matches.len(), 4);
        assert!(matches.iter().all(|m| m.query_idx == m.train_idx && m.distance == 0));
    }

    #[test]
    fn duplicate_train_descriptors_resolve_to_first() {
        let query = [with_bits(3)];
        let train = [with_bits(3), with_bits(3)];
        let matches = cross_check_match(&query, &train);
        assert_eq!(matches, vec![DMatch { query_idx: 0, train_idx: 0, distance: 0 }]);
    }
}
