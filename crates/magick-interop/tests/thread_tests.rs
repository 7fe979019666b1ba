//! Concurrent reads on independent handles

#![cfg(feature = "bundled")]

mod common;

use std::thread;

use common::Ledger;
use magick_interop::{MagickColor, MagickImage};
use pretty_assertions::assert_eq;

const THREADS: u8 = 8;

#[test]
fn test_multithreaded_reads() {
    thread::scope(|scope| {
        let workers: Vec<_> = (0..THREADS)
            .map(|i| {
                scope.spawn(move || {
                    let ledger = Ledger::start();
                    for round in 0..20usize {
                        let width = 1 + usize::from(i) + round % 3;
                        let image = MagickImage::read(&common::ppm(width, 2, [i, i, i])).unwrap();
                        assert_eq!(image.width(), width);
                        assert_eq!(
                            image.pixel_color(width - 1, 1).unwrap(),
                            MagickColor::from_rgba8(i, i, i, 255)
                        );
                        let encoded = image.to_byte_array(Some("PPM")).unwrap();
                        assert_eq!(MagickImage::read(&encoded).unwrap().width(), width);
                    }
                    ledger.assert_balanced();
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
    });
}

#[test]
fn test_image_moves_between_threads() {
    let image = MagickImage::read(&common::ppm(3, 3, [5, 6, 7])).unwrap();
    let (width, copy) = thread::spawn(move || {
        let copy = image.try_clone().unwrap();
        (image.width(), copy)
    })
    .join()
    .unwrap();
    assert_eq!(width, 3);
    assert_eq!(copy.height(), 3);
}

#[test]
fn test_errors_stay_on_their_thread() {
    thread::scope(|scope| {
        let failing = scope.spawn(|| MagickImage::read(&common::invalid_jpeg()).unwrap_err());
        let succeeding = scope.spawn(|| MagickImage::read(&common::jpeg_without_eoi()).unwrap());

        let err = failing.join().unwrap();
        let image = succeeding.join().unwrap();
        assert_eq!(err.as_magick().unwrap().related.len(), 2);
        assert_eq!(image.take_warnings().len(), 1);
    });
}
