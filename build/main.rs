use std::env;
use std::fs::File;
use std::path::Path;

use gl_generator::{Api, Fallbacks, Profile, Registry, StructGenerator};

fn main() {
    let dest = env::var("OUT_DIR").unwrap();
    let mut file = File::create(Path::new(&dest).join("gl_bindings.rs")).unwrap();

    Registry::new(Api::Gles2, (3, 0), Profile::Core, Fallbacks::All,
                  ["GL_KHR_debug",
                   "GL_EXT_discard_framebuffer",
                   "GL_APPLE_framebuffer_multisample"])
        .write_bindings(StructGenerator, &mut file)
        .unwrap();
}
