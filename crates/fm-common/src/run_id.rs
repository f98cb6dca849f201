//! ULID identifiers for processes and ranking runs.
//!
//! The process id is generated on first access and logged at startup; every
//! ranking response gets its own `matchRunId` from [`generate`]. ULIDs sort
//! by creation time, so run ids in logs line up with request order.

use std::sync::OnceLock;

use ulid::Ulid;

static RUN_ID: OnceLock<String> = OnceLock::new();

/// Process-level run id, stable for the lifetime of the process.
#[inline]
pub fn get() -> &'static str {
    RUN_ID.get_or_init(generate)
}

/// Fresh ULID for a single ranking run.
#[inline]
pub fn generate() -> String {
    Ulid::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_id_is_stable() {
        assert_eq!(get(), get());
        assert_eq!(get().len(), 26);
    }

    #[test]
    fn generated_ids_are_unique_and_time_ordered() {
        let older = generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let newer = generate();
        assert_ne!(older, newer);
        assert!(older < newer);
    }
}
