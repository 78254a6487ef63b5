//! Lossless JPEG recompression through mozjpeg's coefficient transcoder.
//!
//! Equivalent to `jpegtran -copy all -optimize -progressive`: the DCT
//! coefficients are read and rewritten with optimized Huffman tables in a
//! progressive scan script. Decoded pixels are bit-identical. APPn and COM
//! markers (ICC, EXIF, XMP) are copied across.

#![allow(unsafe_code)]

use std::ffi::{c_int, c_ulong};
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use mozjpeg_sys::{
    jpeg_common_struct, jpeg_compress_struct, jpeg_copy_critical_parameters,
    jpeg_create_compress, jpeg_create_decompress, jpeg_decompress_struct, jpeg_destroy_compress,
    jpeg_destroy_decompress, jpeg_error_mgr, jpeg_finish_compress, jpeg_finish_decompress,
    jpeg_mem_dest, jpeg_mem_src, jpeg_read_coefficients, jpeg_read_header, jpeg_save_markers,
    jpeg_simple_progression, jpeg_std_error, jpeg_write_coefficients, jpeg_write_marker,
};

const JPEG_APP0: c_int = 0xE0;
const JPEG_APP14: c_int = JPEG_APP0 + 14;
const JPEG_COM: c_int = 0xFE;

/// Transcode `data`, returning the new stream or a message naming the
/// libjpeg error code.
pub(super) fn transcode(data: &[u8]) -> Result<Vec<u8>, String> {
    if data.is_empty() {
        return Err("empty JPEG stream".to_string());
    }
    // libjpeg reports fatal errors through `error_exit`, which unwinds back
    // to here. The guards below release libjpeg state during the unwind.
    panic::catch_unwind(AssertUnwindSafe(|| unsafe { transcode_inner(data) })).unwrap_or_else(
        |payload| match payload.downcast::<LibjpegError>() {
            Ok(err) => Err(format!("libjpeg error {}", err.0)),
            Err(_) => Err("libjpeg transcode panicked".to_string()),
        },
    )
}

struct LibjpegError(c_int);

extern "C-unwind" fn error_exit(cinfo: &mut jpeg_common_struct) {
    let code = unsafe { cinfo.err.as_ref() }.map_or(0, |err| err.msg_code);
    panic::resume_unwind(Box::new(LibjpegError(code)));
}

extern "C-unwind" fn silence(_cinfo: &mut jpeg_common_struct, _level: c_int) {}

fn error_mgr() -> Box<jpeg_error_mgr> {
    unsafe {
        let mut err: Box<jpeg_error_mgr> = Box::new(mem::zeroed());
        jpeg_std_error(&mut err);
        err.error_exit = Some(error_exit);
        err.emit_message = Some(silence);
        err
    }
}

struct Decompress {
    cinfo: Box<jpeg_decompress_struct>,
    _err: Box<jpeg_error_mgr>,
}

impl Decompress {
    unsafe fn new() -> Self {
        let mut err = error_mgr();
        let mut cinfo: Box<jpeg_decompress_struct> = Box::new(unsafe { mem::zeroed() });
        cinfo.common.err = &mut *err;
        unsafe { jpeg_create_decompress(&mut *cinfo) };
        Self { cinfo, _err: err }
    }
}

impl Drop for Decompress {
    fn drop(&mut self) {
        unsafe { jpeg_destroy_decompress(&mut self.cinfo) };
    }
}

struct Compress {
    cinfo: Box<jpeg_compress_struct>,
    _err: Box<jpeg_error_mgr>,
}

impl Compress {
    unsafe fn new() -> Self {
        let mut err = error_mgr();
        let mut cinfo: Box<jpeg_compress_struct> = Box::new(unsafe { mem::zeroed() });
        cinfo.common.err = &mut *err;
        unsafe { jpeg_create_compress(&mut *cinfo) };
        Self { cinfo, _err: err }
    }
}

impl Drop for Compress {
    fn drop(&mut self) {
        unsafe { jpeg_destroy_compress(&mut self.cinfo) };
    }
}

/// Output buffer handed to `jpeg_mem_dest`. Sized so libjpeg never has to
/// grow it; if it does, libjpeg swaps in its own allocation at finish and
/// both are freed here.
struct MemDest {
    buf: *mut u8,
    len: c_ulong,
    original: *mut u8,
}

impl MemDest {
    fn with_capacity(capacity: usize) -> Option<Self> {
        let buf = unsafe { libc::malloc(capacity) }.cast::<u8>();
        if buf.is_null() {
            return None;
        }
        Some(Self {
            buf,
            len: capacity as c_ulong,
            original: buf,
        })
    }
}

impl Drop for MemDest {
    fn drop(&mut self) {
        unsafe {
            if self.buf != self.original {
                libc::free(self.buf.cast());
            }
            libc::free(self.original.cast());
        }
    }
}

unsafe fn transcode_inner(data: &[u8]) -> Result<Vec<u8>, String> {
    unsafe {
        let mut src = Decompress::new();
        jpeg_mem_src(&mut src.cinfo, data.as_ptr(), data.len() as c_ulong);
        jpeg_save_markers(&mut src.cinfo, JPEG_COM, 0xFFFF);
        for n in 0..16 {
            jpeg_save_markers(&mut src.cinfo, JPEG_APP0 + n, 0xFFFF);
        }
        jpeg_read_header(&mut src.cinfo, 1);
        let coefficients = jpeg_read_coefficients(&mut src.cinfo);

        let mut out = Box::new(
            MemDest::with_capacity(data.len() * 2 + 64 * 1024)
                .ok_or_else(|| "out of memory".to_string())?,
        );
        // Declared after `src`, so it is destroyed first.
        let mut dst = Compress::new();
        jpeg_copy_critical_parameters(&src.cinfo, &mut dst.cinfo);
        dst.cinfo.optimize_coding = 1;
        jpeg_simple_progression(&mut dst.cinfo);
        jpeg_mem_dest(&mut dst.cinfo, &mut out.buf, &mut out.len);

        jpeg_write_coefficients(&mut dst.cinfo, coefficients);
        copy_markers(&src.cinfo, &mut dst.cinfo);
        jpeg_finish_compress(&mut dst.cinfo);
        jpeg_finish_decompress(&mut src.cinfo);
        drop(dst);

        Ok(std::slice::from_raw_parts(out.buf, out.len as usize).to_vec())
    }
}

/// Re-emit saved markers, minus the JFIF and Adobe headers libjpeg writes
/// on its own.
unsafe fn copy_markers(src: &jpeg_decompress_struct, dst: &mut jpeg_compress_struct) {
    let mut marker = src.marker_list;
    while let Some(m) = unsafe { marker.as_ref() } {
        let code = c_int::from(m.marker);
        let data: &[u8] = if m.data.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(m.data, m.data_length as usize) }
        };
        let written_by_libjpeg = (dst.write_JFIF_header != 0
            && code == JPEG_APP0
            && data.starts_with(b"JFIF\0"))
            || (dst.write_Adobe_marker != 0 && code == JPEG_APP14 && data.starts_with(b"Adobe"));
        if !written_by_libjpeg {
            unsafe { jpeg_write_marker(dst, code, data.as_ptr(), m.data_length) };
        }
        marker = m.next;
    }
}
