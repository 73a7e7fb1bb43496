//! [`RngSource`] backed by the `rand` crate's OS entropy source.

use rand::RngCore;
use tls12::provider::RngSource;

#[derive(Default)]
pub struct OsRng;

impl RngSource for OsRng {
    fn fill(&self, out: &mut [u8]) {
        rand::thread_rng().fill_bytes(out);
    }
}
