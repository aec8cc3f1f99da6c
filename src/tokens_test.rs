use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn bytes_to_hex_formats_lowercase_pairs() {
    assert_eq!(bytes_to_hex(&[0x00, 0x0f, 0xab, 0xff]), "000fabff");
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_is_unique() {
    let a = generate_token();
    let b = generate_token();
    assert_ne!(a, b);
}

#[test]
fn issued_token_consumes_once() {
    let authority = TokenAuthority::new();
    let token = authority.issue();
    assert_eq!(authority.outstanding(), 1);

    assert_eq!(authority.consume(&token), Ok(()));
    assert_eq!(authority.consume(&token), Err(InvalidToken));
    assert_eq!(authority.outstanding(), 0);
}

#[test]
fn unknown_token_is_invalid() {
    let authority = TokenAuthority::new();
    assert_eq!(authority.consume("not-a-token"), Err(InvalidToken));
    assert_eq!(authority.consume(""), Err(InvalidToken));
}

#[test]
fn consuming_one_token_leaves_others_live() {
    let authority = TokenAuthority::new();
    let first = authority.issue();
    let second = authority.issue();
    assert_ne!(first, second);

    authority.consume(&first).unwrap();
    assert_eq!(authority.consume(&second), Ok(()));
}

#[test]
fn concurrent_consume_has_single_winner() {
    let authority = Arc::new(TokenAuthority::new());
    let token = authority.issue();
    let wins = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let authority = Arc::clone(&authority);
            let token = token.clone();
            let wins = Arc::clone(&wins);
            std::thread::spawn(move || {
                if authority.consume(&token).is_ok() {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(wins.load(Ordering::SeqCst), 1);
}
