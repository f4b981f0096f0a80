use crate::error::{Error, Result};

/// Reads a key typed by a user. Surrounding whitespace is ignored; anything
/// else that is not a decimal `i64` is rejected.
pub fn parse_key(input: &str) -> Result<i64> {
    input.trim().parse::<i64>().map_err(|_| Error::InvalidKey {
        input: input.to_owned(),
    })
}

/// Reads a bucket capacity typed by a user. Input that is not a number at
/// all is reported like a malformed key.
pub fn parse_capacity(input: &str) -> Result<usize> {
    match input.trim().parse::<usize>() {
        Ok(capacity) if capacity > 0 => Ok(capacity),
        Ok(capacity) => Err(Error::InvalidCapacity { capacity }),
        Err(_) => Err(Error::InvalidKey {
            input: input.to_owned(),
        }),
    }
}
