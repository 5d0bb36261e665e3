/// Round a money amount to whole cents.
///
/// The amount is scaled by 100 and rounded half away from zero on the binary
/// product, so 9.005 becomes 9.01 and 1.005 (100.4999… cents) becomes 1.00.
/// The result is the `f64` nearest to a whole number of cents, which Postgres
/// stores in a `NUMERIC(10, 2)` column without further rounding. Negative zero
/// comes back as zero.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0 + 0.0
}
