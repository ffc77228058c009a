//! Kept in its own test binary: the panic hook is shared by every thread of the process.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use greypuffin::execution::Target;
use greypuffin::fuzzer::{start, FuzzInput, FuzzerConfig, HasLen, Mutator};
use rand::Rng;

#[derive(Debug, Clone)]
struct Token(u8);

impl HasLen for Token {
    fn len(&self) -> usize {
        1
    }
}

#[derive(Default)]
struct BrokenMutator;

impl Mutator<Token> for BrokenMutator {
    fn mutate<R: Rng + ?Sized>(&self, _rng: &mut R, _input: &Token) -> Token {
        panic!("mutator broke down")
    }
}

impl FuzzInput for Token {
    type Mutator = BrokenMutator;

    fn from_arg(arg: &str) -> Self {
        Token(arg.len() as u8)
    }
}

struct TokenTarget;

impl Target for TokenTarget {
    type Input = Token;
    type Output = u8;

    fn entrypoint(&self, input: &Token) -> Result<u8, anyhow::Error> {
        greypuffin::step!("token", 1);
        Ok(input.0)
    }

    fn initial_corpus(&self) -> Vec<Token> {
        vec![Token(1)]
    }
}

static HOOK_CALLED: AtomicBool = AtomicBool::new(false);

#[test_log::test]
fn test_panic_hook_is_restored_when_session_unwinds() {
    panic::set_hook(Box::new(|_| HOOK_CALLED.store(true, Ordering::SeqCst)));

    let config = FuzzerConfig {
        static_seed: Some(0),
        max_iters: Some(10),
        ..FuzzerConfig::default()
    };
    let result = panic::catch_unwind(AssertUnwindSafe(|| start(TokenTarget, &config, None)));

    let payload = match result {
        Ok(_) => panic!("the session should have unwound"),
        Err(payload) => payload,
    };
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"mutator broke down"));
    // The session's own hook saw the mutator panic
    assert!(!HOOK_CALLED.load(Ordering::SeqCst));

    let _ = panic::catch_unwind(|| panic!("after the session"));
    assert!(HOOK_CALLED.load(Ordering::SeqCst));

    let _ = panic::take_hook();
}
