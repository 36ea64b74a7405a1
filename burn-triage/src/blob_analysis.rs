//! Largest 4-connected region of a red-on-skin mask.

use crate::color_gate::RednessMask;
use std::collections::VecDeque;

const NEIGHBORS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Pixel count of the largest 4-connected component of `true` pixels.
///
/// Breadth-first flood fill with a visited set; each pixel is enqueued at most once.
pub fn largest_component_size(mask: &RednessMask) -> usize {
    let (width, height) = (mask.width() as i64, mask.height() as i64);
    let mut visited = vec![false; mask.len()];
    let mut queue = VecDeque::new();
    let mut largest = 0usize;

    let index = |x: i64, y: i64| (y * width + x) as usize;

    for y in 0..height {
        for x in 0..width {
            let start = index(x, y);
            if visited[start] || !mask.get(x as u32, y as u32) {
                continue;
            }

            visited[start] = true;
            queue.push_back((x, y));
            let mut size = 0usize;

            while let Some((cx, cy)) = queue.pop_front() {
                size += 1;
                for (dx, dy) in NEIGHBORS {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if nx < 0 || ny < 0 || nx >= width || ny >= height {
                        continue;
                    }
                    let j = index(nx, ny);
                    if !visited[j] && mask.get(nx as u32, ny as u32) {
                        visited[j] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }

            largest = largest.max(size);
        }
    }

    largest
}

/// Largest component as a fraction of all mask pixels (0 for an empty mask).
pub fn largest_component_fraction(mask: &RednessMask) -> f32 {
    if mask.is_empty() {
        return 0.0;
    }
    largest_component_size(mask) as f32 / mask.len() as f32
}
