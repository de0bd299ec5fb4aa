/// 单个 ORB 描述符的字节数
pub const DESCRIPTOR_SIZE: usize = 32;

/// 256bit 的二进制描述符
pub type Descriptor = [u8; DESCRIPTOR_SIZE];

/// 将描述符集合按提取顺序拼接为连续的字节
pub fn to_bytes(descriptors: &[Descriptor]) -> &[u8] {
    bytemuck::cast_slice(descriptors)
}

/// 将连续字节按 32 字节一行还原为描述符集合
///
/// 长度不是 32 的整数倍时返回 `None`，不会截断
pub fn from_bytes(bytes: &[u8]) -> Option<&[Descriptor]> {
    bytemuck::try_cast_slice(bytes).ok()
}
