//! Lag polynomial arithmetic for the ARIMA family

/// Product of two polynomials given by ascending coefficients
pub fn multiply_polynomials(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut product = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            product[i + j] += x * y;
        }
    }
    product
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiply_polynomials() {
        // (1 - B)(1 - B^2) = 1 - B - B^2 + B^3
        let regular = [1.0, -1.0];
        let seasonal = [1.0, 0.0, -1.0];
        assert_eq!(
            multiply_polynomials(&regular, &seasonal),
            vec![1.0, -1.0, -1.0, 1.0]
        );
    }
}
