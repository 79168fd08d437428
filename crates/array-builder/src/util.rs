pub mod bit_tools {
    /// Number of set bits in `data[0..len)`.
    pub fn count_set_bits(data: &[u8], len: usize) -> usize {
        let full_bytes = len / 8;
        let mut count = data[..full_bytes].iter()
            .map(|b| b.count_ones() as usize)
            .sum::<usize>();

        let remainder = len % 8;
        if remainder != 0 {
            let mask = (1u8 << remainder) - 1;
            count += (data[full_bytes] & mask).count_ones() as usize;
        }
        count
    }

    /// Clears bits of the byte containing position `len` that lie at or above `len`.
    pub fn clear_trailing_bits(data: &mut [u8], len: usize) {
        let remainder = len % 8;
        if remainder != 0 {
            data[len / 8] &= (1u8 << remainder) - 1
        }
    }

}


macro_rules! uninitialized_buffer_access {
    () => {
        panic!("builder buffers are accessed before initialization")
    };
}
pub(crate) use uninitialized_buffer_access;
