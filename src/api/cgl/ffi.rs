//! FFI declarations not provided by the upstream `cgl` crate.

#![allow(non_upper_case_globals)]

use std::ffi::c_void;

use cgl::{CGLContextObj, CGLError, CGLPixelFormatAttribute};
use objc2_io_surface::IOSurfaceRef;

pub(crate) type GLenum = u32;
pub(crate) type GLuint = u32;
pub(crate) type GLint = i32;
pub(crate) type GLsizei = i32;

/// No CGL error occurred.
pub(crate) const kCGLNoError: CGLError = 0;

/// Choose a renderer capable of GL 3.2 or later.
pub(crate) const kCGLOGLPVersion_3_2_Core: CGLPixelFormatAttribute = 0x3200;

/// `'BGRA'`.
pub(crate) const kCVPixelFormatType_32BGRA: i32 = 0x4247_5241;

pub(crate) const GL_TEXTURE_RECTANGLE: GLenum = 0x84F5;
pub(crate) const GL_RGBA: GLenum = 0x1908;
pub(crate) const GL_BGRA: GLenum = 0x80E1;
pub(crate) const GL_UNSIGNED_INT_8_8_8_8_REV: GLenum = 0x8367;
pub(crate) const GL_FRAMEBUFFER: GLenum = 0x8D40;
pub(crate) const GL_RENDERBUFFER: GLenum = 0x8D41;
pub(crate) const GL_COLOR_ATTACHMENT0: GLenum = 0x8CE0;
pub(crate) const GL_DEPTH_STENCIL_ATTACHMENT: GLenum = 0x821A;
pub(crate) const GL_DEPTH24_STENCIL8: GLenum = 0x88F0;
pub(crate) const GL_FRAMEBUFFER_COMPLETE: GLenum = 0x8CD5;

#[link(name = "OpenGL", kind = "framework")]
extern "C" {
    pub(crate) fn CGLGetShareGroup(ctx: CGLContextObj) -> *mut c_void;

    pub(crate) fn CGLTexImageIOSurface2D(
        ctx: CGLContextObj,
        target: GLenum,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
        format: GLenum,
        ty: GLenum,
        io_surface: *const IOSurfaceRef,
        plane: GLuint,
    ) -> CGLError;

    pub(crate) fn glFlush();
    pub(crate) fn glGenTextures(n: GLsizei, textures: *mut GLuint);
    pub(crate) fn glDeleteTextures(n: GLsizei, textures: *const GLuint);
    pub(crate) fn glBindTexture(target: GLenum, texture: GLuint);
    pub(crate) fn glGenFramebuffers(n: GLsizei, framebuffers: *mut GLuint);
    pub(crate) fn glDeleteFramebuffers(n: GLsizei, framebuffers: *const GLuint);
    pub(crate) fn glBindFramebuffer(target: GLenum, framebuffer: GLuint);
    pub(crate) fn glFramebufferTexture2D(
        target: GLenum,
        attachment: GLenum,
        textarget: GLenum,
        texture: GLuint,
        level: GLint,
    );
    pub(crate) fn glCheckFramebufferStatus(target: GLenum) -> GLenum;
    pub(crate) fn glGenRenderbuffers(n: GLsizei, renderbuffers: *mut GLuint);
    pub(crate) fn glDeleteRenderbuffers(n: GLsizei, renderbuffers: *const GLuint);
    pub(crate) fn glBindRenderbuffer(target: GLenum, renderbuffer: GLuint);
    pub(crate) fn glRenderbufferStorage(
        target: GLenum,
        internal_format: GLenum,
        width: GLsizei,
        height: GLsizei,
    );
    pub(crate) fn glFramebufferRenderbuffer(
        target: GLenum,
        attachment: GLenum,
        renderbuffer_target: GLenum,
        renderbuffer: GLuint,
    );
}
