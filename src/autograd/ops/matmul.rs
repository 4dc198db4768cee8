//! Row-major matrix products over flat slices
//!
//! The attention model keeps its activations as flat `Vec<f32>` per batch
//! row. Its backward pass needs products with either operand transposed;
//! those variants index the stored layout directly instead of materialising
//! a transpose.

/// `A · B` for `A` m×k and `B` k×n
pub fn matmul(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b.len(), k * n);

    let mut c = vec![0.0f32; m * n];
    for (a_row, c_row) in a.chunks_exact(k).zip(c.chunks_exact_mut(n)) {
        for (&a_ip, b_row) in a_row.iter().zip(b.chunks_exact(n)) {
            if a_ip == 0.0 {
                continue;
            }
            for (c_ij, &b_pj) in c_row.iter_mut().zip(b_row) {
                *c_ij += a_ip * b_pj;
            }
        }
    }
    c
}

/// `A · Bᵀ` for `A` m×k and `B` stored n×k
pub fn matmul_bt(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b.len(), n * k);

    let mut c = Vec::with_capacity(m * n);
    for a_row in a.chunks_exact(k) {
        c.extend(b.chunks_exact(k).map(|b_row| dot(a_row, b_row)));
    }
    c
}

/// `Aᵀ · B` for `A` stored k×m and `B` k×n, added into `out` (m×n)
pub fn matmul_at_acc(out: &mut [f32], a: &[f32], b: &[f32], m: usize, k: usize, n: usize) {
    debug_assert_eq!(a.len(), k * m);
    debug_assert_eq!(b.len(), k * n);
    debug_assert_eq!(out.len(), m * n);

    for (a_row, b_row) in a.chunks_exact(m).zip(b.chunks_exact(n)) {
        for (&a_pi, out_row) in a_row.iter().zip(out.chunks_exact_mut(n)) {
            if a_pi == 0.0 {
                continue;
            }
            for (o, &b_pj) in out_row.iter_mut().zip(b_row) {
                *o += a_pi * b_pj;
            }
        }
    }
}

/// `Aᵀ · B` for `A` stored k×m and `B` k×n
pub fn matmul_at(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    let mut c = vec![0.0f32; m * n];
    matmul_at_acc(&mut c, a, b, m, k, n);
    c
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
