fn main() {
    let self_exe = cgi_suexec::discover_self_path();

    let prog_name = self_exe
        .as_ref()
        .ok()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("cgi-suexec")
        .to_string();

    match self_exe.and_then(cgi_suexec::run) {
        Ok(never) => match never {},
        Err(err) => cgi_suexec::error::die(&prog_name, err),
    }
}
