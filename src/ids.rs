use rand::Rng;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFERENCE_CODE_LEN: usize = 10;
const TRANSACTION_NUMBER_LEN: usize = 20;

/// Short uppercase alphanumeric code printed on receipts and shown in
/// rider/driver apps for trips and bookings.
pub fn reference_code() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERENCE_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// 20-digit number identifying a driver balance transaction.
pub fn transaction_number() -> String {
    let mut rng = rand::thread_rng();
    (0..TRANSACTION_NUMBER_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
