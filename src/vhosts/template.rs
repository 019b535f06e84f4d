/// nginx server block template and the scan that reads it back.
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::Vhost;

pub const DEFAULT_PHP_VERSION: &str = "8.2";

static PHP_FPM_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"php([0-9]\.[0-9])-fpm").unwrap());

/// Server block for `domain` and `www.domain` serving `docroot` through PHP-FPM
pub fn build_nginx_config(domain: &str, docroot: &str, php_version: &str) -> String {
    format!(
        r#"server {{
    listen 80;
    listen [::]:80;

    server_name {domain} www.{domain};
    root {docroot};
    index index.php index.html index.htm;

    access_log /var/log/nginx/{domain}.access.log;
    error_log  /var/log/nginx/{domain}.error.log;

    location / {{
        try_files $uri $uri/ /index.php?$query_string;
    }}

    location ~ \.php$ {{
        include snippets/fastcgi-php.conf;
        fastcgi_pass unix:/run/php/php{php_version}-fpm.sock;
    }}

    location ~ /\.ht {{
        deny all;
    }}

    # Security headers
    add_header X-Frame-Options "SAMEORIGIN" always;
    add_header X-Content-Type-Options "nosniff" always;
    add_header Referrer-Policy "no-referrer-when-downgrade" always;
}}
"#
    )
}

/// Read docroot, certificate and PHP version back out of a server block.
///
/// `enabled` is left false; it depends on the sites-enabled link.
pub fn parse_vhost_config(domain: &str, content: &str) -> Vhost {
    let mut vhost = Vhost {
        domain: domain.to_string(),
        docroot: None,
        ssl: false,
        enabled: false,
        php: None,
    };

    for line in content.lines().map(str::trim) {
        if line.starts_with('#') {
            continue;
        }
        if let Some(root) = line.strip_prefix("root ") {
            if vhost.docroot.is_none() {
                vhost.docroot = Some(root.trim().trim_end_matches(';').trim().to_string());
            }
        }
        // certbot adds ssl_certificate and ssl_certificate_key
        if line.contains("ssl_certificate") {
            vhost.ssl = true;
        }
        if vhost.php.is_none() {
            if let Some(caps) = PHP_FPM_PATTERN.captures(line) {
                vhost.php = Some(caps[1].to_string());
            }
        }
    }

    vhost
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_roundtrip() {
        let conf = build_nginx_config("shop.example.com", "/var/www/shop/public_html", "8.3");
        assert!(conf.contains("server_name shop.example.com www.shop.example.com;"));
        assert!(conf.contains("fastcgi_pass unix:/run/php/php8.3-fpm.sock;"));
        assert!(conf.contains("try_files $uri $uri/ /index.php?$query_string;"));

        let vhost = parse_vhost_config("shop.example.com", &conf);
        assert_eq!(vhost.docroot.as_deref(), Some("/var/www/shop/public_html"));
        assert_eq!(vhost.php.as_deref(), Some("8.3"));
        assert!(!vhost.ssl);
    }

    #[test]
    fn test_ssl_detection() {
        let conf = "server {\n    root /var/www/a;\n    ssl_certificate /etc/letsencrypt/live/a/fullchain.pem; # managed by Certbot\n}\n";
        let vhost = parse_vhost_config("a", conf);
        assert!(vhost.ssl);
        assert_eq!(vhost.php, None);
    }

    #[test]
    fn test_commented_lines_ignored() {
        let conf = "# ssl_certificate later\nroot /srv/x;\n";
        let vhost = parse_vhost_config("x", conf);
        assert!(!vhost.ssl);
        assert_eq!(vhost.docroot.as_deref(), Some("/srv/x"));
    }
}
