/// Discrete Gini coefficient of `amounts`, rounded to two decimals.
///
/// For ascending `x[0..n]`: `G = Σ(i·x[i] − Σ_{j<i} x[j]) / (Σx · n)`.
/// An all-zero input has no inequality and yields `0.0`.
pub fn compute_gini(mut amounts: Vec<f64>) -> f64 {
    if amounts.is_empty() {
        return 0.0;
    }
    amounts.sort_by(|a, b| a.total_cmp(b));

    let mut sum_of_differences = 0.0;
    let mut running_sum = 0.0;
    for (i, x) in amounts.iter().enumerate() {
        sum_of_differences += x * i as f64 - running_sum;
        running_sum += x;
    }

    if running_sum == 0.0 {
        return 0.0;
    }

    let gini = sum_of_differences / running_sum / amounts.len() as f64;
    (gini * 100.0).round() / 100.0
}
