use anyhow::{bail, Context, Result};

mod common;
use crate::common::*;

fn main() {
    none_method();
    username_method();
    malformed_requests();
    end_of_stream();
    static_configuration_file();
    account_management();
    broken_configuration();
    println!("✅ SUCCESS");
}

fn none_method() {
    println!("🧪 none_method");
    slink_helper_dev(|helper| {
        assert_eq!(helper.request("c1 none")?, "OK ! none\n");
        assert_eq!(helper.request("127.0.0.1 none")?, "OK ! none\n");
        Ok(())
    })
    .expect("test fully run");
}

fn username_method() {
    println!("🧪 username_method");
    slink_helper_dev(|helper| {
        assert_eq!(
            helper.request("c1 username test test123")?,
            "OK ! username test\n"
        );
        assert_eq!(
            helper.request("c1 username test@localhost test123")?,
            "OK 127.0.0.1:1080 username test\n"
        );
        assert_eq!(
            helper.request("c1 username test%40localhostv6 test123")?,
            "OK [::1]:1080 username test\n"
        );
        assert_eq!(
            helper.request("c1 username test@elsewhere test123")?,
            "ERR Unknown server\n"
        );
        assert_eq!(
            helper.request("c1 username test@elsewhere wrong")?,
            "ERR Unknown server\n"
        );
        assert_eq!(
            helper.request("c1 username alice test123")?,
            "ERR Authentication failure (no such user)\n"
        );
        assert_eq!(
            helper.request("c1 username test2 test123")?,
            "ERR Authentication failure (bad password)\n"
        );
        Ok(())
    })
    .expect("test fully run");
}

fn malformed_requests() {
    println!("🧪 malformed_requests");
    slink_helper_dev(|helper| {
        for line in [
            "",
            "c1",
            "c1 gssapi",
            "c1 none extra",
            "c1  none",
            "c1 username test",
            "c1 username test test123 extra",
        ] {
            assert_eq!(
                helper.request(line).context(format!("request {:?}", line))?,
                "ERR Invalid number of argument\n"
            );
        }
        assert_eq!(
            helper.request("c1 username %ff%fe test123")?,
            "ERR Fatal error\n"
        );
        // still alive
        assert_eq!(helper.request("c2 none")?, "OK ! none\n");
        Ok(())
    })
    .expect("test fully run");
}

fn end_of_stream() {
    println!("🧪 end_of_stream");
    (|| -> Result<()> {
        let out = transcript(&["--dev"], "")?;
        assert!(out.status.success());
        assert!(out.stdout.is_empty());

        let out = transcript(&["--dev"], "c1 none\nc2 username test test123\nc3 none")?;
        assert!(out.status.success());
        assert_eq!(
            String::from_utf8(out.stdout)?,
            "OK ! none\nOK ! username test\n"
        );
        Ok(())
    })()
    .expect("test fully run");
}

fn static_configuration_file() {
    println!("🧪 static_configuration_file");
    (|| -> Result<()> {
        let path = scratch_file("static.toml");
        write_file(
            &path,
            r#"
backend = "Static"

[routes]
office = "10.0.0.1:1080"

[users.bob]
password = "b0b"
"#,
        )?;
        let config = path.to_string_lossy().to_string();

        slink_helper(&["-c", &config], |helper| {
            assert_eq!(
                helper.request("c1 username bob@office b0b")?,
                "OK 10.0.0.1:1080 username bob\n"
            );
            assert_eq!(
                helper.request("c1 username bob@localhost b0b")?,
                "ERR Unknown server\n"
            );
            assert_eq!(
                helper.request("c1 username test test123")?,
                "ERR Authentication failure (no such user)\n"
            );
            Ok(())
        })?;

        std::fs::remove_file(&path)?;
        Ok(())
    })()
    .expect("test fully run");
}

fn account_management() {
    println!("🧪 account_management");
    (|| -> Result<()> {
        let path = scratch_file("accounts.toml");
        let _ = std::fs::remove_file(&path);
        let config = path.to_string_lossy().to_string();

        let out = run(
            &["-c", &config, "account", "add", "--login", "carol"],
            &[("SLINK_HELPER_PASSWORD", "hunter2")],
        )?;
        if !out.status.success() {
            bail!("account add failed: {}", String::from_utf8_lossy(&out.stderr));
        }
        let stored = std::fs::read_to_string(&path)?;
        assert!(stored.contains("$argon2"));
        assert!(!stored.contains("hunter2"));

        slink_helper(&["-c", &config], |helper| {
            assert_eq!(
                helper.request("c1 username carol hunter2")?,
                "OK ! username carol\n"
            );
            assert_eq!(
                helper.request("c1 username carol hunter3")?,
                "ERR Authentication failure (bad password)\n"
            );
            Ok(())
        })?;

        let out = run(&["-c", &config, "account", "delete", "--login", "carol"], &[])?;
        assert!(out.status.success());

        slink_helper(&["-c", &config], |helper| {
            assert_eq!(
                helper.request("c1 username carol hunter2")?,
                "ERR Authentication failure (no such user)\n"
            );
            Ok(())
        })?;

        std::fs::remove_file(&path)?;
        Ok(())
    })()
    .expect("test fully run");
}

fn broken_configuration() {
    println!("🧪 broken_configuration");
    (|| -> Result<()> {
        let missing = scratch_file("missing.toml");
        let out = run(&["-c", &missing.to_string_lossy()], &[])?;
        assert!(!out.status.success());
        assert!(out.stdout.is_empty());

        let path = scratch_file("broken.toml");
        write_file(&path, "backend = \"Ldap\"\n")?;
        let out = run(&["-c", &path.to_string_lossy()], &[])?;
        assert!(!out.status.success());
        assert!(out.stdout.is_empty());

        std::fs::remove_file(&path)?;
        Ok(())
    })()
    .expect("test fully run");
}
