//! Series color cycle

/// D3 Category 10, also the matplotlib default cycle
pub const CATEGORY10: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
    "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

/// Color of the `index`-th series, wrapping around
pub fn cycle(index: usize) -> &'static str {
    CATEGORY10[index % CATEGORY10.len()]
}
