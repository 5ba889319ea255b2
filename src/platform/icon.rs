//! Glyph to `HICON` conversion

use std::ffi::c_void;

use windows::Win32::Graphics::Gdi::{CreateBitmap, DeleteObject};
use windows::Win32::UI::WindowsAndMessaging::{CreateIconIndirect, DestroyIcon, HICON, ICONINFO};

use crate::render::{GlyphImage, RenderError};

/// An icon handle destroyed on drop
pub struct OwnedIcon(HICON);

impl OwnedIcon {
    pub fn handle(&self) -> HICON {
        self.0
    }
}

impl Drop for OwnedIcon {
    fn drop(&mut self) {
        unsafe {
            let _ = DestroyIcon(self.0);
        }
    }
}

/// Build a 32-bit alpha icon from an RGBA glyph
pub fn glyph_to_icon(glyph: &GlyphImage) -> Result<OwnedIcon, RenderError> {
    let size = glyph.size() as i32;

    // GDI expects BGRA
    let mut bgra = glyph.pixels().to_vec();
    for px in bgra.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    // Monochrome rows are padded to 16 bits
    let mask_bits = vec![0u8; (glyph.size() as usize).div_ceil(16) * 2 * glyph.size() as usize];

    unsafe {
        let color = CreateBitmap(size, size, 1, 32, Some(bgra.as_ptr() as *const c_void));
        if color.is_invalid() {
            return Err(RenderError::IconHandle("CreateBitmap (color) failed".to_string()));
        }
        let mask = CreateBitmap(size, size, 1, 1, Some(mask_bits.as_ptr() as *const c_void));
        if mask.is_invalid() {
            let _ = DeleteObject(color.into());
            return Err(RenderError::IconHandle("CreateBitmap (mask) failed".to_string()));
        }

        let info = ICONINFO {
            fIcon: true.into(),
            xHotspot: 0,
            yHotspot: 0,
            hbmMask: mask,
            hbmColor: color,
        };
        let icon = CreateIconIndirect(&info);

        let _ = DeleteObject(color.into());
        let _ = DeleteObject(mask.into());

        icon.map(OwnedIcon)
            .map_err(|e| RenderError::IconHandle(e.to_string()))
    }
}
