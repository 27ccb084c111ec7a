/// Connected black regions, used to find fiducial marker candidates
use std::collections::HashMap;

use crate::models::BinaryImage;

/// Union-Find data structure
pub struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
        }
    }

    pub fn find(&mut self, x: u32) -> u32 {
        // iterative with path halving; share-sized images make deep recursion risky
        let mut x = x;
        while self.parent[x as usize] != x {
            let grandparent = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grandparent;
            x = grandparent;
        }
        x
    }

    pub fn union(&mut self, x: u32, y: u32) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x != root_y {
            self.parent[root_x as usize] = root_y;
        }
    }
}

/// Bounding box and pixel count of one 8-connected black region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
    pub area: usize,
}

impl Region {
    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    /// Fraction of the bounding box covered by the region
    pub fn fill_ratio(&self) -> f32 {
        self.area as f32 / (self.width() * self.height()) as f32
    }
}

/// Find connected black regions (8-connectivity)
pub fn find_black_regions(image: &BinaryImage) -> Vec<Region> {
    let width = image.width();
    let height = image.height();

    let mut labels = vec![0u32; width * height];
    let mut next_label = 1u32;
    let mut uf = UnionFind::new(width * height + 1);

    // First pass: label components
    for y in 0..height {
        for x in 0..width {
            if !image.get(x, y) {
                continue;
            }

            let idx = y * width + x;
            let mut neighbor_labels = [0u32; 4];
            let mut n = 0;

            // left, up, up-left, up-right
            if x > 0 && image.get(x - 1, y) {
                neighbor_labels[n] = labels[idx - 1];
                n += 1;
            }
            if y > 0 && image.get(x, y - 1) {
                neighbor_labels[n] = labels[idx - width];
                n += 1;
            }
            if x > 0 && y > 0 && image.get(x - 1, y - 1) {
                neighbor_labels[n] = labels[idx - width - 1];
                n += 1;
            }
            if x + 1 < width && y > 0 && image.get(x + 1, y - 1) {
                neighbor_labels[n] = labels[idx - width + 1];
                n += 1;
            }

            match neighbor_labels[..n].iter().min() {
                None => {
                    labels[idx] = next_label;
                    next_label += 1;
                }
                Some(&min_label) => {
                    labels[idx] = min_label;
                    for &l in &neighbor_labels[..n] {
                        if l != min_label {
                            uf.union(min_label, l);
                        }
                    }
                }
            }
        }
    }

    // Second pass: bounding boxes and areas per root label
    let mut regions: HashMap<u32, Region> = HashMap::new();
    for y in 0..height {
        for x in 0..width {
            let label = labels[y * width + x];
            if label == 0 {
                continue;
            }
            let root = uf.find(label);

            let entry = regions.entry(root).or_insert(Region {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                area: 0,
            });
            entry.min_x = entry.min_x.min(x);
            entry.min_y = entry.min_y.min(y);
            entry.max_x = entry.max_x.max(x);
            entry.max_y = entry.max_y.max(y);
            entry.area += 1;
        }
    }

    let mut out: Vec<Region> = regions.into_values().collect();
    out.sort_by_key(|r| (r.min_y, r.min_x));
    out
}
