//! Splitting ordered collections into fixed-size chunks.

use crate::core::{Result, ServiceError};

/// Split `items` into consecutive chunks of `size` elements.
///
/// Every chunk but the last holds exactly `size` elements; the last one holds
/// the remainder. Chunks borrow from `items` in order, so concatenating them
/// reproduces the input.
///
/// `None` stands for a missing collection and fails with `InvalidInput`,
/// while an empty slice yields no chunks. A zero `size` fails with
/// `InvalidArgument`.
///
/// # Examples
///
/// ```
/// use ova_service::split::split_to_chunks;
///
/// let items = [1, 2, 3, 4, 5];
/// let chunks = split_to_chunks(Some(&items[..]), 2).unwrap();
/// assert_eq!(chunks, vec![&[1, 2][..], &[3, 4][..], &[5][..]]);
/// ```
pub fn split_to_chunks<T>(items: Option<&[T]>, size: usize) -> Result<Vec<&[T]>> {
    let items = items.ok_or_else(|| {
        ServiceError::InvalidInput("original collection doesn't exist".to_string())
    })?;

    if size == 0 {
        return Err(ServiceError::InvalidArgument(
            "chunk size must be positive".to_string(),
        ));
    }

    Ok(items.chunks(size).collect())
}
