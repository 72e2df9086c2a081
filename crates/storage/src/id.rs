//! Document id generation.

use docket_core::DocId;
use rand::Rng;

/// Characters used in generated ids; visually ambiguous ones are left out.
const UNMISTAKABLE_CHARS: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTWXYZabcdefghijkmnopqrstuvwxyz";

/// Length of a generated id.
pub const ID_LENGTH: usize = 17;

/// Returns a fresh random id.
pub fn random_id() -> DocId {
    random_id_with(&mut rand::thread_rng())
}

/// Returns a random id drawn from the given generator.
pub fn random_id_with<R: Rng + ?Sized>(rng: &mut R) -> DocId {
    let id: String = (0..ID_LENGTH)
        .map(|_| UNMISTAKABLE_CHARS[rng.gen_range(0..UNMISTAKABLE_CHARS.len())] as char)
        .collect();
    DocId::String(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_id_shape() {
        let id = random_id();
        assert_eq!(id.as_str().len(), ID_LENGTH);
        assert!(id.as_str().bytes().all(|b| UNMISTAKABLE_CHARS.contains(&b)));
        assert_ne!(random_id(), id);
    }

    #[test]
    fn test_seeded_ids_repeat() {
        let a = random_id_with(&mut StdRng::seed_from_u64(7));
        let b = random_id_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
