//! Host layout <-> work image conversion through the public bridge

use bgremove_filter::{ColorSpaceBridge, ErrorKind, PixelFormat, VideoFrame, WorkImage};
use image::Rgb;

fn yuv_frame(format: PixelFormat, width: u32, height: u32) -> VideoFrame {
    let len = VideoFrame::layout_len(format, width, height).unwrap();
    let luma = (width * height) as usize;
    let data = (0..len)
        .map(|i| {
            if i < luma {
                16 + (i * 37 % 220) as u8
            } else {
                16 + (i * 53 % 225) as u8
            }
        })
        .collect();
    VideoFrame::new(format, width, height, data)
}

fn assert_round_trip(original: &VideoFrame) {
    let work = ColorSpaceBridge::to_work_image(original).unwrap();
    assert_eq!(work.dimensions(), original.dimensions());

    let mut written = original.clone();
    written.data.iter_mut().for_each(|b| *b = 0);
    ColorSpaceBridge::write_back(&work, &mut written).unwrap();

    for (i, (after, before)) in written.data.iter().zip(&original.data).enumerate() {
        assert!(
            after.abs_diff(*before) <= 1,
            "{} {}x{} byte {i}: {before} -> {after}",
            original.format,
            original.width,
            original.height
        );
    }
}

#[test]
fn test_i420_round_trip() {
    for (w, h) in [(2, 2), (16, 8), (33, 17), (1, 1), (7, 3)] {
        assert_round_trip(&yuv_frame(PixelFormat::I420, w, h));
    }
}

#[test]
fn test_nv12_round_trip() {
    for (w, h) in [(2, 2), (16, 8), (33, 17), (1, 1), (5, 9)] {
        assert_round_trip(&yuv_frame(PixelFormat::Nv12, w, h));
    }
}

#[test]
fn test_rgba_round_trip_is_exact() {
    let data: Vec<u8> = (0..9 * 5 * 4).map(|i| (i * 11 % 256) as u8).collect();
    let original = VideoFrame::new(PixelFormat::Rgba, 9, 5, data);
    let work = ColorSpaceBridge::to_work_image(&original).unwrap();
    let mut written = original.clone();
    ColorSpaceBridge::write_back(&work, &mut written).unwrap();
    assert_eq!(written, original);
}

#[test]
fn test_grey_has_neutral_chroma() {
    let grey: WorkImage = WorkImage::from_pixel(4, 4, Rgb([0.6, 0.6, 0.6]));
    let mut frame = VideoFrame::new(PixelFormat::I420, 4, 4, vec![0; 24]);
    ColorSpaceBridge::write_back(&grey, &mut frame).unwrap();
    assert!(frame.data[16..].iter().all(|&c| c == 128));
    // 16 + 219 * 0.6 = 147.4
    assert!(frame.data[..16].iter().all(|&y| y == 147));
}

#[test]
fn test_out_of_gamut_work_values_clamp_on_write() {
    let hot: WorkImage = WorkImage::from_pixel(2, 2, Rgb([1.5, -0.2, 0.5]));
    let mut frame = VideoFrame::new(PixelFormat::Rgba, 2, 2, vec![9; 16]);
    ColorSpaceBridge::write_back(&hot, &mut frame).unwrap();
    assert_eq!(&frame.data[..4], &[255, 0, 128, 9]);
}

#[test]
fn test_unsupported_and_malformed_frames() {
    let bgra = VideoFrame::new(PixelFormat::Bgra, 2, 2, vec![0; 16]);
    assert_eq!(
        ColorSpaceBridge::to_work_image(&bgra).unwrap_err().kind(),
        ErrorKind::UnsupportedFormat
    );

    let short = VideoFrame::new(PixelFormat::Nv12, 4, 4, vec![0; 10]);
    assert_eq!(
        ColorSpaceBridge::to_work_image(&short).unwrap_err().kind(),
        ErrorKind::Inference
    );

    let mut frame = VideoFrame::new(PixelFormat::Rgba, 2, 2, vec![0; 16]);
    let wrong_size: WorkImage = WorkImage::from_pixel(3, 2, Rgb([0.0, 0.0, 0.0]));
    assert!(ColorSpaceBridge::write_back(&wrong_size, &mut frame).is_err());
    assert_eq!(frame.data, vec![0; 16]);
}
