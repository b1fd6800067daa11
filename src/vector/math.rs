//! Padding and distance math. Fixed-width zero-padding keeps storage
//! portable across embedding dimensions; cosine/dot similarity must
//! always use the unpadded slice, sized by the row's `dimensions` column.

/// Maximum stored vector width. Vectors are right-padded with zeros to
/// this width; the query vector is padded identically.
pub const D_MAX: usize = 2048;

/// Right-pad `v` with zeros to [`D_MAX`]. Panics if `v.len() > D_MAX`
/// (a provider producing vectors wider than D_MAX is a configuration bug,
/// not a runtime condition callers should need to branch on).
pub fn pad_to_dmax(v: &[f32]) -> Vec<f32> {
    assert!(
        v.len() <= D_MAX,
        "embedding dimension {} exceeds D_MAX {}",
        v.len(),
        D_MAX
    );
    let mut padded = vec![0.0f32; D_MAX];
    padded[..v.len()].copy_from_slice(v);
    padded
}

/// Slice a padded vector back to its authoritative `dimensions`.
pub fn unpad(padded: &[f32], dimensions: usize) -> &[f32] {
    &padded[..dimensions.min(padded.len())]
}

/// Cosine distance: `1 - cosine_similarity`, in `[0, 2]` for arbitrary
/// vectors (typically `[0, 1]` for non-negative embeddings). Monotone
/// with dissimilarity.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let a = &a[..len];
    let b = &b[..len];

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    let similarity = dot / (norm_a * norm_b);
    1.0 - similarity.clamp(-1.0, 1.0)
}
