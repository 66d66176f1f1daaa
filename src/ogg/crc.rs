// Ogg page checksum
//
// This is the "forward" CRC-32 from RFC 3533: polynomial 0x04c11db7,
// MSB first, initial value 0, no final xor. It is not the reflected CRC-32
// used by zlib, so a stock crc32 routine gives the wrong answer here.

const POLYNOMIAL: u32 = 0x04c1_1db7;

static TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut r = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            r = if r & 0x8000_0000 != 0 {
                (r << 1) ^ POLYNOMIAL
            } else {
                r << 1
            };
            bit += 1;
        }
        table[i] = r;
        i += 1;
    }
    table
}

/// Feed `bytes` into a running checksum.
#[inline]
pub fn update(crc: u32, bytes: &[u8]) -> u32 {
    bytes.iter().fold(crc, |crc, &b| {
        (crc << 8) ^ TABLE[((crc >> 24) as u8 ^ b) as usize]
    })
}

/// Checksum of a complete page image (checksum field already zeroed).
#[inline]
pub fn checksum(bytes: &[u8]) -> u32 {
    update(0, bytes)
}
