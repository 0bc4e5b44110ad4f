use media_types::Result;

/**
    Allocate a zeroed buffer, reporting allocation failure as an error
    instead of aborting.
*/
pub fn alloc_buffer(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, 0);
    Ok(buf)
}
