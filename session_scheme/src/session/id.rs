use crate::errors::SchemeError;
use crate::utils::gen_random_string;

use super::types::SessionId;

/// Number of random bytes behind each generated identifier.
const SESSION_ID_BYTES: usize = 32;

/// Source of fresh session identifiers.
pub trait SessionIdGenerator: Send + Sync {
    fn generate(&self) -> Result<SessionId, SchemeError>;
}

/// Default generator backed by the process-wide system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl SessionIdGenerator for RandomIdGenerator {
    fn generate(&self) -> Result<SessionId, SchemeError> {
        let value = gen_random_string(SESSION_ID_BYTES)?;
        SessionId::parse(&value).ok_or_else(|| {
            SchemeError::Crypto("Generated session id is not well-formed".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<_> = (0..256)
            .map(|_| RandomIdGenerator.generate().unwrap())
            .collect();
        assert_eq!(ids.len(), 256);
    }

    proptest! {
        #[test]
        fn generated_ids_parse_back(_seed in 0u8..32) {
            let id = RandomIdGenerator.generate().unwrap();
            prop_assert_eq!(id.as_str().len(), 43);
            prop_assert_eq!(SessionId::parse(id.as_str()), Some(id));
        }
    }
}
