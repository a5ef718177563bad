fn main() {
    cpp_build::build("src/lib.rs");
}
