//! Region splicing: merges rendered audio back into a copy of the source.
//!
//! Samples the placement does not cover are copied from the original
//! unchanged, bit for bit.

use crate::buffer::{Placement, Region, RenderedRegion, SampleBuffer};

/// Splice `rendered` over `region` of a clone of `original`.
///
/// With `covers_full_length` the render is addressed at absolute indices and
/// only `rendered[region.start..region.end)` is copied; otherwise
/// `rendered[0..region.len())` maps onto the region. Missing channels and
/// short renders leave the original samples in place.
pub fn splice(
    original: &SampleBuffer,
    rendered: &[Vec<f32>],
    region: Region,
    covers_full_length: bool,
) -> SampleBuffer {
    let len = original.len();
    let start = region.start.min(len);
    let end = region.end.clamp(start, len);

    let mut channels = original.channels().to_vec();
    for (out, src) in channels.iter_mut().zip(rendered.iter()) {
        for i in start..end {
            let src_index = if covers_full_length { i } else { i - start };
            match src.get(src_index) {
                Some(&s) => out[i] = s,
                None => break,
            }
        }
    }
    rebuild(channels, original.sample_rate())
}

/// Splice a render according to its declared placement.
pub fn splice_rendered(
    original: &SampleBuffer,
    rendered: &RenderedRegion,
    region: Region,
) -> SampleBuffer {
    match rendered.placement {
        Placement::Region => splice(original, &rendered.channels, region, false),
        Placement::FullLength => splice(original, &rendered.channels, region, true),
        Placement::Overwrite { start } => overwrite(original, &rendered.channels, start),
        Placement::Insert { at } => insert(original, &rendered.channels, at),
    }
}

/// Replace audio from `start` for as long as the render lasts, never past the end.
fn overwrite(original: &SampleBuffer, rendered: &[Vec<f32>], start: usize) -> SampleBuffer {
    let len = original.len();
    let mut channels = original.channels().to_vec();
    for (out, src) in channels.iter_mut().zip(rendered.iter()) {
        let start = start.min(len);
        let n = src.len().min(len - start);
        out[start..start + n].copy_from_slice(&src[..n]);
    }
    rebuild(channels, original.sample_rate())
}

/// Insert a block at `at`, shifting everything after it. Channels the render
/// lacks receive silence so lengths stay equal.
fn insert(original: &SampleBuffer, rendered: &[Vec<f32>], at: usize) -> SampleBuffer {
    let at = at.min(original.len());
    let grow = rendered.iter().map(|c| c.len()).max().unwrap_or(0);
    let channels = original
        .channels()
        .iter()
        .enumerate()
        .map(|(ch, src)| {
            let mut out = Vec::with_capacity(src.len() + grow);
            out.extend_from_slice(&src[..at]);
            let block = rendered.get(ch).map(|c| c.as_slice()).unwrap_or(&[]);
            out.extend_from_slice(block);
            out.resize(at + grow, 0.0);
            out.extend_from_slice(&src[at..]);
            out
        })
        .collect();
    rebuild(channels, original.sample_rate())
}

fn rebuild(channels: Vec<Vec<f32>>, sample_rate: u32) -> SampleBuffer {
    // Channel lengths are preserved by every splice mode, so this cannot fail
    // for a buffer that was valid on the way in.
    match SampleBuffer::new(channels, sample_rate) {
        Ok(buffer) => buffer,
        Err(e) => unreachable!("splice broke the channel invariant: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, channels: usize) -> SampleBuffer {
        let data = (0..channels)
            .map(|c| (0..len).map(|i| (i as f32 + c as f32) * 1e-4).collect())
            .collect();
        SampleBuffer::new(data, 44100).unwrap()
    }

    #[test]
    fn region_relative_boundary() {
        let original = ramp(5000, 2);
        let region = Region::new(1000, 2000).unwrap();
        let rendered = vec![vec![0.5; 1000], vec![-0.5; 1000]];
        let out = splice(&original, &rendered, region, false);

        assert_eq!(out.len(), 5000);
        for c in 0..2 {
            assert_eq!(&out.channel(c)[..1000], &original.channel(c)[..1000]);
            assert_eq!(&out.channel(c)[2000..], &original.channel(c)[2000..]);
            assert_eq!(&out.channel(c)[1000..2000], rendered[c].as_slice());
        }
    }

    #[test]
    fn full_length_copies_only_region() {
        let original = ramp(100, 1);
        let rendered = vec![vec![0.25; 100]];
        let out = splice(&original, &rendered, Region::new(10, 20).unwrap(), true);
        assert_eq!(&out.channel(0)[..10], &original.channel(0)[..10]);
        assert!(out.channel(0)[10..20].iter().all(|&s| s == 0.25));
        assert_eq!(&out.channel(0)[20..], &original.channel(0)[20..]);
    }

    #[test]
    fn missing_channels_and_short_renders_are_untouched() {
        let original = ramp(100, 2);
        let rendered = vec![vec![0.9; 5]];
        let out = splice(&original, &rendered, Region::new(10, 20).unwrap(), false);
        assert!(out.channel(0)[10..15].iter().all(|&s| s == 0.9));
        assert_eq!(&out.channel(0)[15..20], &original.channel(0)[15..20]);
        assert_eq!(out.channel(1), original.channel(1));
    }

    #[test]
    fn long_tail_is_discarded() {
        let original = ramp(100, 1);
        let rendered = vec![vec![0.1; 500]];
        let out = splice(&original, &rendered, Region::new(90, 100).unwrap(), false);
        assert_eq!(out.len(), 100);
        assert!(out.channel(0)[90..].iter().all(|&s| s == 0.1));
    }

    #[test]
    fn overwrite_is_clipped_at_end() {
        let original = ramp(50, 1);
        let rendered = RenderedRegion::new(vec![vec![0.3; 40]], Placement::Overwrite { start: 30 });
        let out = splice_rendered(&original, &rendered, Region::new(40, 50).unwrap());
        assert_eq!(out.len(), 50);
        assert_eq!(&out.channel(0)[..30], &original.channel(0)[..30]);
        assert!(out.channel(0)[30..].iter().all(|&s| s == 0.3));
    }

    #[test]
    fn insert_grows_and_shifts() {
        let original = ramp(10, 2);
        let rendered = RenderedRegion::new(vec![vec![0.7; 4]], Placement::Insert { at: 6 });
        let out = splice_rendered(&original, &rendered, Region::new(2, 6).unwrap());
        assert_eq!(out.len(), 14);
        assert_eq!(&out.channel(0)[..6], &original.channel(0)[..6]);
        assert!(out.channel(0)[6..10].iter().all(|&s| s == 0.7));
        assert_eq!(&out.channel(0)[10..], &original.channel(0)[6..]);
        // second channel had no render: silence is inserted
        assert!(out.channel(1)[6..10].iter().all(|&s| s == 0.0));
        assert_eq!(&out.channel(1)[10..], &original.channel(1)[6..]);
    }
}
