//! Embedded WGSL for the compute tracer and the display pass.
//!
//! Bindings and uniform structs are not written by hand: they are generated
//! from the slot table and the uniform layouts and prepended to the bodies.

use super::slots::{wgsl_storage_declarations, COMPUTE_UNIFORM_GROUP, DEBUG_TARGET, RENDER_TARGET};
use super::uniforms::{COMPUTE_UNIFORMS, DISPLAY_UNIFORMS};

/// Workgroup edge; must match `@workgroup_size` in [`TRACE_BODY`].
pub const WORKGROUP_SIZE: u32 = 32;

const TRACE_BODY: &str = r#"
const PI: f32 = 3.14159265;
const INF: f32 = 1e30;
const T_MIN: f32 = 0.001;
const ORTHO_HALF_HEIGHT: f32 = 5.0;

const MAT_DIFFUSE: i32 = 0;
const MAT_METAL: i32 = 1;
const MAT_DIELECTRIC: i32 = 2;
const MAT_LIGHT: i32 = 3;

struct Ray {
    origin: vec3<f32>,
    dir: vec3<f32>,
}

struct Hit {
    t: f32,
    p: vec3<f32>,
    normal: vec3<f32>,
    front: bool,
    albedo: vec3<f32>,
    emission: vec3<f32>,
    roughness: f32,
    material: i32,
}

var<private> rng_state: u32;

fn pcg(v: u32) -> u32 {
    let state = v * 747796405u + 2891336453u;
    let word = ((state >> ((state >> 28u) + 4u)) ^ state) * 277803737u;
    return (word >> 22u) ^ word;
}

fn rand() -> f32 {
    rng_state = pcg(rng_state);
    return f32(rng_state) / 4294967295.0;
}

fn random_unit_vector() -> vec3<f32> {
    let z = rand() * 2.0 - 1.0;
    let a = rand() * 2.0 * PI;
    let r = sqrt(max(0.0, 1.0 - z * z));
    return vec3<f32>(r * cos(a), r * sin(a), z);
}

fn hit_sphere(i: u32, ray: Ray, t_max: f32, hit: ptr<function, Hit>) -> bool {
    let center = sphere_positions[i].xyz;
    let radius = sphere_radius[i];
    let oc = ray.origin - center;
    let a = dot(ray.dir, ray.dir);
    let half_b = dot(oc, ray.dir);
    let c = dot(oc, oc) - radius * radius;
    let disc = half_b * half_b - a * c;
    if disc < 0.0 {
        return false;
    }
    let sq = sqrt(disc);
    var root = (-half_b - sq) / a;
    if root <= T_MIN || root >= t_max {
        root = (-half_b + sq) / a;
        if root <= T_MIN || root >= t_max {
            return false;
        }
    }
    (*hit).t = root;
    (*hit).p = ray.origin + root * ray.dir;
    let outward = ((*hit).p - center) / radius;
    (*hit).front = dot(ray.dir, outward) < 0.0;
    (*hit).normal = select(-outward, outward, (*hit).front);
    (*hit).albedo = sphere_albedo[i].xyz;
    (*hit).emission = sphere_emission[i].xyz;
    (*hit).roughness = sphere_roughness[i];
    (*hit).material = sphere_material[i];
    return true;
}

// Moller-Trumbore; triangles shade as diffuse plus their emission.
fn hit_triangle(i: u32, ray: Ray, t_max: f32, hit: ptr<function, Hit>) -> bool {
    let v0 = triangle_v0[i].xyz;
    let e1 = triangle_v1[i].xyz - v0;
    let e2 = triangle_v2[i].xyz - v0;
    let pv = cross(ray.dir, e2);
    let det = dot(e1, pv);
    if abs(det) < 1e-8 {
        return false;
    }
    let inv_det = 1.0 / det;
    let tv = ray.origin - v0;
    let u = dot(tv, pv) * inv_det;
    if u < 0.0 || u > 1.0 {
        return false;
    }
    let qv = cross(tv, e1);
    let v = dot(ray.dir, qv) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    let t = dot(e2, qv) * inv_det;
    if t <= T_MIN || t >= t_max {
        return false;
    }
    let outward = normalize(cross(e1, e2));
    (*hit).t = t;
    (*hit).p = ray.origin + t * ray.dir;
    (*hit).front = dot(ray.dir, outward) < 0.0;
    (*hit).normal = select(-outward, outward, (*hit).front);
    (*hit).albedo = triangle_albedo[i].xyz;
    (*hit).emission = triangle_emission[i].xyz;
    (*hit).roughness = 0.0;
    (*hit).material = MAT_DIFFUSE;
    return true;
}

fn hit_scene(ray: Ray, hit: ptr<function, Hit>) -> bool {
    var closest = INF;
    var found = false;
    var tmp: Hit;
    for (var i = 0u; i < frame.n_spheres; i++) {
        if hit_sphere(i, ray, closest, &tmp) {
            closest = tmp.t;
            found = true;
            *hit = tmp;
        }
    }
    for (var i = 0u; i < frame.n_triangles; i++) {
        if hit_triangle(i, ray, closest, &tmp) {
            closest = tmp.t;
            found = true;
            *hit = tmp;
        }
    }
    return found;
}

fn sky(dir: vec3<f32>) -> vec3<f32> {
    let t = 0.5 * (normalize(dir).y + 1.0);
    return frame.ambient_light * mix(vec3<f32>(1.0), vec3<f32>(0.5, 0.7, 1.0), t);
}

// Schlick
fn reflectance(cosine: f32, ratio: f32) -> f32 {
    var r0 = (1.0 - ratio) / (1.0 + ratio);
    r0 = r0 * r0;
    return r0 + (1.0 - r0) * pow(1.0 - cosine, 5.0);
}

fn scatter(ray: ptr<function, Ray>, hit: Hit, attenuation: ptr<function, vec3<f32>>) -> bool {
    let unit = normalize((*ray).dir);
    var dir: vec3<f32>;
    switch hit.material {
        case MAT_METAL: {
            dir = reflect(unit, hit.normal) + hit.roughness * random_unit_vector();
            if dot(dir, hit.normal) <= 0.0 {
                return false;
            }
            *attenuation = hit.albedo;
        }
        case MAT_DIELECTRIC: {
            let ratio = select(1.5, 1.0 / 1.5, hit.front);
            let cos_theta = min(dot(-unit, hit.normal), 1.0);
            let sin_theta = sqrt(1.0 - cos_theta * cos_theta);
            if ratio * sin_theta > 1.0 || reflectance(cos_theta, ratio) > rand() {
                dir = reflect(unit, hit.normal);
            } else {
                dir = refract(unit, hit.normal, ratio);
            }
            *attenuation = vec3<f32>(1.0);
        }
        default: {
            dir = hit.normal + random_unit_vector();
            if dot(dir, dir) < 1e-8 {
                dir = hit.normal;
            }
            *attenuation = hit.albedo;
        }
    }
    *ray = Ray(hit.p, normalize(dir));
    return true;
}

fn trace(primary: Ray) -> vec3<f32> {
    var ray = primary;
    var throughput = vec3<f32>(1.0);
    var radiance = vec3<f32>(0.0);
    for (var depth = 0; depth < frame.n_bounces; depth++) {
        var hit: Hit;
        if !hit_scene(ray, &hit) {
            radiance += throughput * sky(ray.dir);
            break;
        }
        radiance += throughput * hit.emission;
        if hit.material == MAT_LIGHT {
            radiance += throughput * hit.albedo;
            break;
        }
        var attenuation: vec3<f32>;
        if !scatter(&ray, hit, &attenuation) {
            break;
        }
        throughput *= attenuation;
    }
    return radiance;
}

fn camera_ray(pixel: vec2<f32>, size: vec2<f32>) -> Ray {
    let aspect = size.x / size.y;
    let w = normalize(frame.lookfrom - frame.lookat);
    let u = normalize(cross(vec3<f32>(0.0, 1.0, 0.0), w));
    let v = cross(w, u);
    // y grows downward in texel space
    let ndc = vec2<f32>(pixel.x / size.x - 0.5, 0.5 - pixel.y / size.y);

    if frame.orthographic != 0u {
        let extent = 2.0 * ORTHO_HALF_HEIGHT;
        let origin = frame.lookfrom + ndc.x * extent * aspect * u + ndc.y * extent * v;
        return Ray(origin, -w);
    }

    let h = tan(radians(frame.vfov) * 0.5);
    let offset = ndc.x * 2.0 * h * aspect * u + ndc.y * 2.0 * h * v;
    return Ray(frame.lookfrom, normalize(offset - w));
}

@compute @workgroup_size(32, 32, 1)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let dims = textureDimensions(render_target);
    if gid.x >= dims.x || gid.y >= dims.y {
        return;
    }
    let coord = vec2<i32>(gid.xy);
    let size = vec2<f32>(dims);
    rng_state = pcg(gid.x * 1973u + gid.y * 9277u + frame.seed * 26699u) | 1u;

    var color = vec3<f32>(0.0);
    let n = max(frame.n_samples, 1);
    for (var s = 0; s < n; s++) {
        let jitter = vec2<f32>(rand(), rand());
        color += trace(camera_ray(vec2<f32>(gid.xy) + jitter, size));
    }
    color /= f32(n);
    if any(color != color) {
        color = vec3<f32>(0.0);
    }

    var result = vec4<f32>(color, 1.0);
    if frame.incremental != 0u && frame.accumulated_frames > 0u {
        let prev = textureLoad(render_target, coord);
        result = mix(prev, result, 1.0 / f32(frame.accumulated_frames + 1u));
    }
    textureStore(render_target, coord, result);

    // normals in rgb, view-space depth in alpha
    var hit: Hit;
    var dbg = vec4<f32>(0.0);
    if hit_scene(camera_ray(vec2<f32>(gid.xy) + 0.5, size), &hit) {
        let pv = frame.view * vec4<f32>(hit.p, 1.0);
        dbg = vec4<f32>(hit.normal * 0.5 + 0.5, -pv.z);
    }
    textureStore(debug_target, coord, dbg);
}
"#;

const DISPLAY_BODY: &str = r#"
struct VertexIn {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
}

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(v: VertexIn) -> VertexOut {
    var out: VertexOut;
    out.clip = vec4<f32>(v.position, 0.0, 1.0);
    out.uv = v.uv;
    return out;
}

fn reinhard(c: vec3<f32>) -> vec3<f32> {
    return c / (1.0 + c);
}

fn reinhard_extended(c: vec3<f32>) -> vec3<f32> {
    let white = 4.0;
    return c * (1.0 + c / (white * white)) / (1.0 + c);
}

fn aces_narkowicz(c: vec3<f32>) -> vec3<f32> {
    let x = c * 0.6;
    return clamp((x * (2.51 * x + 0.03)) / (x * (2.43 * x + 0.59) + 0.14), vec3<f32>(0.0), vec3<f32>(1.0));
}

fn uncharted2_partial(x: vec3<f32>) -> vec3<f32> {
    let a = 0.15;
    let b = 0.50;
    let c = 0.10;
    let d = 0.20;
    let e = 0.02;
    let f = 0.30;
    return ((x * (a * x + c * b) + d * e) / (x * (a * x + b) + d * f)) - e / f;
}

fn uncharted2(c: vec3<f32>) -> vec3<f32> {
    let curr = uncharted2_partial(c * 2.0);
    let white_scale = vec3<f32>(1.0) / uncharted2_partial(vec3<f32>(11.2));
    return curr * white_scale;
}

fn lottes(x: vec3<f32>) -> vec3<f32> {
    let a = vec3<f32>(1.6);
    let d = vec3<f32>(0.977);
    let hdr_max = vec3<f32>(8.0);
    let mid_in = vec3<f32>(0.18);
    let mid_out = vec3<f32>(0.267);
    let b = (-pow(mid_in, a) + pow(hdr_max, a) * mid_out)
        / ((pow(hdr_max, a * d) - pow(mid_in, a * d)) * mid_out);
    let c = (pow(hdr_max, a * d) * pow(mid_in, a) - pow(hdr_max, a) * pow(mid_in, a * d) * mid_out)
        / ((pow(hdr_max, a * d) - pow(mid_in, a * d)) * mid_out);
    return pow(x, a) / (pow(x, a * d) * b + c);
}

fn uchimura_curve(x: vec3<f32>) -> vec3<f32> {
    let p = 1.0;  // max brightness
    let a = 1.0;  // contrast
    let m = 0.22; // linear section start
    let l = 0.4;  // linear section length
    let c = 1.33; // black tightness
    let b = 0.0;  // pedestal
    let l0 = ((p - m) * l) / a;
    let s0 = m + l0;
    let s1 = m + a * l0;
    let c2 = (a * p) / (p - s1);
    let cp = -c2 / p;
    let w0 = vec3<f32>(1.0) - smoothstep(vec3<f32>(0.0), vec3<f32>(m), x);
    let w2 = step(vec3<f32>(m + l0), x);
    let w1 = vec3<f32>(1.0) - w0 - w2;
    let t = m * pow(x / m, vec3<f32>(c)) + b;
    let s = p - (p - s1) * exp(cp * (x - s0));
    let lin = m + a * (x - m);
    return t * w0 + lin * w1 + s * w2;
}

// gamma is baked into this curve
fn unreal(x: vec3<f32>) -> vec3<f32> {
    return x / (x + 0.155) * 1.019;
}

fn tone_map(c: vec3<f32>, mode: i32) -> vec3<f32> {
    switch mode {
        case 1: { return reinhard(c); }
        case 2: { return reinhard_extended(c); }
        case 3: { return aces_narkowicz(c); }
        case 4: { return uncharted2(c); }
        case 5: { return lottes(c); }
        case 6: { return uchimura_curve(c); }
        case 7: { return unreal(c); }
        default: { return c; }
    }
}

@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    let hdr = textureSample(render_texture, render_sampler, in.uv).rgb;
    let exposed = max(hdr * params.exposure, vec3<f32>(0.0));
    var mapped = tone_map(exposed, params.tone_mapping_mode);
    if params.tone_mapping_mode != 7 {
        mapped = pow(mapped, vec3<f32>(1.0 / 2.2));
    }
    return vec4<f32>(clamp(mapped, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}
"#;

/// Complete compute program source.
pub fn compute_shader_source() -> String {
    let mut src = String::new();
    src.push_str(&COMPUTE_UNIFORMS.wgsl_struct());
    src.push_str(&format!(
        "@group({COMPUTE_UNIFORM_GROUP}) @binding(0) var<uniform> frame: {};\n",
        COMPUTE_UNIFORMS.struct_name
    ));
    src.push_str(&format!(
        "@group(0) @binding({}) var render_target: texture_storage_2d<rgba32float, read_write>;\n",
        RENDER_TARGET.image_unit
    ));
    src.push_str(&format!(
        "@group(0) @binding({}) var debug_target: texture_storage_2d<rgba32float, read_write>;\n",
        DEBUG_TARGET.image_unit
    ));
    src.push_str(&wgsl_storage_declarations());
    src.push_str(TRACE_BODY);
    src
}

/// Complete display program source.
pub fn display_shader_source() -> String {
    let mut src = String::new();
    src.push_str(&DISPLAY_UNIFORMS.wgsl_struct());
    src.push_str(&format!(
        "@group(0) @binding({}) var render_texture: texture_2d<f32>;\n",
        RENDER_TARGET.texture_unit
    ));
    src.push_str(&format!(
        "@group(1) @binding(0) var<uniform> params: {};\n",
        DISPLAY_UNIFORMS.struct_name
    ));
    src.push_str("@group(1) @binding(1) var render_sampler: sampler;\n");
    src.push_str(DISPLAY_BODY);
    src
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_source_binds_everything() {
        let src = compute_shader_source();
        assert!(src.contains("var<uniform> frame: FrameUniforms;"));
        assert!(src.contains("@binding(0) var render_target"));
        assert!(src.contains("@binding(1) var debug_target"));
        assert!(src.contains("@binding(24) var<storage, read> triangle_emission"));
        assert!(src.contains(&format!("@workgroup_size({WORKGROUP_SIZE}, {WORKGROUP_SIZE}, 1)")));
    }

    #[test]
    fn test_display_source() {
        let src = display_shader_source();
        assert!(src.contains("struct DisplayParams {"));
        assert!(src.contains("var render_texture: texture_2d<f32>;"));
        assert!(src.contains("fn fs_main"));
    }
}
