// FFI bindings for the mobile host app (Swift / Kotlin via C)
use std::ffi::CStr;
use std::os::raw::{c_char, c_float, c_int};
use std::slice;
use std::sync::Arc;

use crate::{compare_letters, EvaluatorConfig, FixedRecognizer, RasterBitmap, RecognitionEngine};

/// Opaque handle holding the evaluation config and a runtime to drive it
pub struct HarfHandle {
    config: EvaluatorConfig,
    runtime: tokio::runtime::Runtime,
}

/// C-compatible evaluation result
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct HarfResult {
    pub score: c_float,
    pub text_score: c_float,
    pub bounding_box_match: c_float,
    pub stroke_coverage: c_float,
    pub overflow_penalty: c_float,
    pub combined_score: c_float,
}

/// Create an evaluator handle
///
/// # Safety
/// `config_json` is either null (defaults) or a valid null-terminated UTF-8 string
#[no_mangle]
pub unsafe extern "C" fn harf_new(config_json: *const c_char) -> *mut HarfHandle {
    let config = if config_json.is_null() {
        EvaluatorConfig::default()
    } else {
        let raw = match CStr::from_ptr(config_json).to_str() {
            Ok(s) => s,
            Err(_) => return std::ptr::null_mut(),
        };
        match EvaluatorConfig::from_json_str(raw) {
            Ok(c) => c,
            Err(_) => return std::ptr::null_mut(),
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(_) => return std::ptr::null_mut(),
    };

    Box::into_raw(Box::new(HarfHandle { config, runtime }))
}

/// Grade a drawing against a reference glyph
///
/// Both bitmaps are 8-bit grayscale, row-major, ink bright on black.
/// `recognized` is the text the platform OCR read off the drawing, or null.
///
/// Returns 0 on success, -1 on null arguments, -2 on invalid UTF-8,
/// -3 on malformed bitmaps, -4 if evaluation failed.
///
/// # Safety
/// - handle must be a valid pointer returned from harf_new
/// - each pixel pointer must reference `width * height` readable bytes
/// - `expected` must be a valid null-terminated string; `recognized` may be null
/// - `result_out` must point to writable memory for one `HarfResult`
#[no_mangle]
pub unsafe extern "C" fn harf_evaluate(
    handle: *mut HarfHandle,
    user_pixels: *const u8,
    user_width: u32,
    user_height: u32,
    reference_pixels: *const u8,
    reference_width: u32,
    reference_height: u32,
    expected: *const c_char,
    recognized: *const c_char,
    result_out: *mut HarfResult,
) -> c_int {
    if handle.is_null()
        || user_pixels.is_null()
        || reference_pixels.is_null()
        || expected.is_null()
        || result_out.is_null()
    {
        return -1;
    }

    let handle = &*handle;

    let expected = match CStr::from_ptr(expected).to_str() {
        Ok(s) => s,
        Err(_) => return -2,
    };
    let recognized = if recognized.is_null() {
        None
    } else {
        match CStr::from_ptr(recognized).to_str() {
            Ok(s) => Some(s.to_string()),
            Err(_) => return -2,
        }
    };

    let user_len = user_width as usize * user_height as usize;
    let reference_len = reference_width as usize * reference_height as usize;
    let user = slice::from_raw_parts(user_pixels, user_len).to_vec();
    let reference = slice::from_raw_parts(reference_pixels, reference_len).to_vec();

    let (user, reference) = match (
        RasterBitmap::from_raw(user_width, user_height, user),
        RasterBitmap::from_raw(reference_width, reference_height, reference),
    ) {
        (Ok(u), Ok(r)) => (u, r),
        _ => return -3,
    };

    let engine = RecognitionEngine::new(
        Arc::new(FixedRecognizer::new(recognized)),
        &handle.config,
    );
    let result = match handle
        .runtime
        .block_on(engine.evaluate(user, reference, expected))
    {
        Ok(r) => r,
        Err(_) => return -4,
    };

    let shape = result.shape_analysis;
    *result_out = HarfResult {
        score: result.score,
        text_score: result.text_score,
        bounding_box_match: shape.bounding_box_match(),
        stroke_coverage: shape.stroke_coverage(),
        overflow_penalty: shape.overflow_penalty(),
        combined_score: shape.combined_score(),
    };

    0
}

/// Letter-comparison score in [0, 1]; 0 for invalid input
///
/// # Safety
/// `expected` must be a valid null-terminated string; `recognized` may be null
#[no_mangle]
pub unsafe extern "C" fn harf_compare_letters(
    recognized: *const c_char,
    expected: *const c_char,
) -> c_float {
    if expected.is_null() {
        return 0.0;
    }
    let Ok(expected) = CStr::from_ptr(expected).to_str() else {
        return 0.0;
    };
    let recognized = if recognized.is_null() {
        None
    } else {
        match CStr::from_ptr(recognized).to_str() {
            Ok(s) => Some(s),
            Err(_) => return 0.0,
        }
    };
    compare_letters(recognized, expected)
}

/// Free an evaluator handle
///
/// # Safety
/// handle must be a valid pointer returned from harf_new
#[no_mangle]
pub unsafe extern "C" fn harf_free(handle: *mut HarfHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Get library version
#[no_mangle]
pub extern "C" fn harf_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_evaluate_through_c_abi() {
        let side = 40u32;
        let mut pixels = vec![0u8; (side * side) as usize];
        for y in 10..30 {
            for x in 16..24 {
                pixels[(y * side + x) as usize] = 255;
            }
        }
        let expected = CString::new("ا").unwrap();
        let recognized = CString::new("أ").unwrap();

        unsafe {
            let handle = harf_new(std::ptr::null());
            assert!(!handle.is_null());

            let mut out = HarfResult::default();
            let rc = harf_evaluate(
                handle,
                pixels.as_ptr(),
                side,
                side,
                pixels.as_ptr(),
                side,
                side,
                expected.as_ptr(),
                recognized.as_ptr(),
                &mut out,
            );
            assert_eq!(rc, 0);
            assert!((out.text_score - 0.9).abs() < 1e-6);
            assert_eq!(out.stroke_coverage, 1.0);
            assert_eq!(out.score, 1.0);

            let rc = harf_evaluate(
                handle,
                std::ptr::null(),
                side,
                side,
                pixels.as_ptr(),
                side,
                side,
                expected.as_ptr(),
                std::ptr::null(),
                &mut out,
            );
            assert_eq!(rc, -1);

            harf_free(handle);
        }
    }

    #[test]
    fn test_compare_letters_through_c_abi() {
        let sin = CString::new("س").unwrap();
        let shin = CString::new("ش").unwrap();
        unsafe {
            assert!((harf_compare_letters(sin.as_ptr(), shin.as_ptr()) - 0.7).abs() < 1e-6);
            assert_eq!(harf_compare_letters(std::ptr::null(), shin.as_ptr()), 0.0);
            assert_eq!(harf_compare_letters(sin.as_ptr(), std::ptr::null()), 0.0);
        }
    }

    #[test]
    fn test_invalid_config_yields_null_handle() {
        let bad = CString::new("{ nope").unwrap();
        let oversized_grid = CString::new(r#"{"shape": {"grid_size": 65536}}"#).unwrap();
        unsafe {
            assert!(harf_new(bad.as_ptr()).is_null());
            assert!(harf_new(oversized_grid.as_ptr()).is_null());
        }
    }
}
