fn main() {
    denstream_pipeline::cli::run();
}
