use once_cell::sync::Lazy;

/// Largest 8-bit sample value
pub const MAX_SAMPLE: f64 = 255.0;

/// `log10(255)`, evaluated once per process.
pub static PSNR_K: Lazy<f64> = Lazy::new(|| MAX_SAMPLE.log10());

/// Log-MSE and PSNR derived from a luma MSE.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Psnr {
    pub log10_mse: f64,
    pub psnr_db: f64,
}

/// `None` without an MSE; `(-inf, +inf)` for identical frames.
pub fn psnr(mse_y: Option<f64>) -> Option<Psnr> {
    let mse = mse_y?;
    if mse == 0.0 {
        return Some(Psnr {
            log10_mse: f64::NEG_INFINITY,
            psnr_db: f64::INFINITY,
        });
    }

    let log10_mse = mse.log10();
    Some(Psnr {
        log10_mse,
        psnr_db: 20.0 * *PSNR_K - 10.0 * log10_mse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn undefined_stays_undefined() {
        assert_eq!(psnr(None), None);
    }

    #[test]
    fn zero_mse_is_infinite() {
        let p = psnr(Some(0.0)).unwrap();
        assert_eq!(p.log10_mse, f64::NEG_INFINITY);
        assert_eq!(p.psnr_db, f64::INFINITY);
    }

    #[test]
    fn finite_mse() {
        let p = psnr(Some(100.0)).unwrap();
        assert_relative_eq!(p.log10_mse, 2.0);
        assert_relative_eq!(p.psnr_db, 20.0 * 255f64.log10() - 20.0, epsilon = 1e-12);

        // Full-scale error is 0 dB
        let p = psnr(Some(255.0 * 255.0)).unwrap();
        assert_relative_eq!(p.psnr_db, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn psnr_decreases_with_mse() {
        let low = psnr(Some(1.0)).unwrap().psnr_db;
        let high = psnr(Some(50.0)).unwrap().psnr_db;
        assert!(low > high);
        assert_relative_eq!(low, 48.130803608679, epsilon = 1e-9);
    }
}
