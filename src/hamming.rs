use crate::descriptor::Descriptor;

#[inline(always)]
pub fn hamming(va: &Descriptor, vb: &Descriptor) -> u32 {
    hamming_32(va, vb)
}

#[inline(always)]
pub fn hamming_naive<const N: usize>(va: &[u8], vb: &[u8]) -> u32 {
    let mut sum = 0;
    for i in 0..N {
        sum += (va[i] ^ vb[i]).count_ones();
    }
    sum
}

#[inline(always)]
pub fn hamming_32(va: &Descriptor, vb: &Descriptor) -> u32 {
    // 描述符本身只保证 1 字节对齐，这里逐段读出 u64
    let word = |v: &Descriptor, i: usize| {
        u64::from_le_bytes([v[i], v[i + 1], v[i + 2], v[i + 3], v[i + 4], v[i + 5], v[i + 6], v[i + 7]])
    };
    (word(va, 0) ^ word(vb, 0)).count_ones()
        + (word(va, 8) ^ word(vb, 8)).count_ones()
        + (word(va, 16) ^ word(vb, 16)).count_ones()
        + (word(va, 24) ^ word(vb, 24)).count_ones()
}

/// 在 vb 中寻找距离 va 最近的描述符，返回索引和距离
///
/// 距离相同时取最先出现的那个，vb 为空时返回 `None`
pub fn nearest(va: &Descriptor, vb: &[Descriptor]) -> Option<(usize, u32)> {
    let mut best: Option<(usize, u32)> = None;
    for (i, v) in vb.iter().enumerate() {
        let d = hamming(va, v);
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((i, d)),
        }
        if d == 0 {
            break;
        }
    }
    best
}

/// 批量计算 va 中每个描述符在 vb 中的最近邻
pub fn batch_nearest(va: &[Descriptor], vb: &[Descriptor]) -> Vec<Option<(usize, u32)>> {
    va.iter().map(|v| nearest(v, vb)).collect()
}
