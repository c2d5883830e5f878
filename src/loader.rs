use std::path::Path;
use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4};
use log::{debug, info};

use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::material::{Material, GLASS_IOR};
use crate::math::Spectrum;
use crate::mesh::MeshBuilder;
use crate::primitive::{Aggregate, GeometricPrimitive};
use crate::scene::Scene;
use crate::sexpr::{parse, Datum, ListForm};
use crate::shape::Shape;
use crate::skylight::Skylight;
use crate::texture::Texture;
use crate::transform::Transform;

/// Evaluated scene value. The description language is dynamically typed;
/// this is its closed set of runtime payloads.
pub enum Value {
    Number(f64),
    Str(String),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Xform(Transform),
    Shape(Arc<Shape>),
    Texture(Texture),
    Material(Arc<Material>),
    Prim(GeometricPrimitive),
    Camera(Camera),
    Skylight(Skylight),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Vec2(_) => "vec2",
            Value::Vec3(_) => "vec3",
            Value::Vec4(_) => "vec4",
            Value::Xform(_) => "xform",
            Value::Shape(_) => "shape",
            Value::Texture(_) => "texture",
            Value::Material(_) => "material",
            Value::Prim(_) => "prim",
            Value::Camera(_) => "camera",
            Value::Skylight(_) => "skylight",
        }
    }
}

/// An evaluated argument of a form: either a plain value or a named
/// attribute like `(fov 60)` carrying its own values.
enum Arg {
    Value(Value),
    Attr(Attr),
}

struct Attr {
    name: String,
    line: usize,
    values: Vec<Arg>,
}

/// Load and materialize a scene description file: all `prim` values go
/// into the aggregate, the last `camera` and `skylight` win.
pub fn load_scene(path: &Path) -> Result<Scene> {
    info!("loading scene {}", path.display());
    let src = std::fs::read_to_string(path)
        .map_err(|e| Error::Scene(format!("cannot read {}: {e}", path.display())))?;
    let forms = parse(&src)?;

    let ev = Evaluator {
        dir: path.parent().unwrap_or_else(|| Path::new(".")),
    };

    let mut aggregate = Aggregate::new();
    let mut camera = None;
    let mut skylight = None;
    for form in &forms {
        match ev.eval_form(form)? {
            Value::Prim(p) => aggregate.add(p),
            Value::Camera(c) => camera = Some(c),
            Value::Skylight(s) => skylight = Some(s),
            other => debug!(
                "line {}: unused top-level {} value",
                form.line,
                other.kind()
            ),
        }
    }

    let camera = camera
        .ok_or_else(|| Error::Scene(format!("{}: no camera in scene", path.display())))?;
    let skylight = skylight.unwrap_or(Skylight::Solid(Spectrum::ZERO));

    info!("scene has {} primitives", aggregate.len());
    Ok(Scene::new(aggregate, camera, skylight))
}

/// Heads that evaluate to values; every other list argument is a named
/// attribute of its enclosing form.
const FORM_HEADS: &[&str] = &[
    "vec2", "vec3", "vec4", "rgb", "xform", "shape", "texture", "material", "prim", "camera",
    "skylight",
];

struct Evaluator<'a> {
    /// Directory of the scene file; mesh and probe paths resolve against it.
    dir: &'a Path,
}

impl Evaluator<'_> {
    fn eval_form(&self, form: &ListForm) -> Result<Value> {
        let head = form
            .items
            .first()
            .and_then(Datum::as_name)
            .ok_or_else(|| err(form.line, "form must start with a name"))?;
        let rest = &form.items[1..];

        match head {
            "vec2" | "vec3" | "vec4" | "rgb" => self.eval_immediate(head, form.line, rest),
            "xform" => self.eval_xform(form.line, rest),
            "shape" => self.eval_shape(form.line, rest),
            "texture" => self.eval_texture(form.line, rest),
            "material" => self.eval_material(form.line, rest),
            "prim" => self.eval_prim(form.line, rest),
            "camera" => self.eval_camera(form.line, rest),
            "skylight" => self.eval_skylight(form.line, rest),
            other => Err(err(form.line, &format!("unknown form {other:?}"))),
        }
    }

    fn eval_immediate(&self, head: &str, line: usize, rest: &[Datum]) -> Result<Value> {
        let mut nums = Vec::with_capacity(rest.len());
        for item in rest {
            nums.push(
                item.as_number()
                    .ok_or_else(|| err(line, &format!("{head} takes numbers")))? as f32,
            );
        }
        let want = match head {
            "vec2" => 2,
            "vec4" => 4,
            _ => 3,
        };
        // A single argument splats across all components.
        if nums.len() == 1 {
            nums = vec![nums[0]; want];
        }
        if nums.len() != want {
            return Err(err(line, &format!("{head} needs {want} components")));
        }
        Ok(match head {
            "vec2" => Value::Vec2(Vec2::new(nums[0], nums[1])),
            "vec4" => Value::Vec4(Vec4::new(nums[0], nums[1], nums[2], nums[3])),
            _ => Value::Vec3(Vec3::new(nums[0], nums[1], nums[2])),
        })
    }

    /// `(xform (translate <v>) (scale s) (rotate deg <axis>) ...)`,
    /// composed left to right.
    fn eval_xform(&self, line: usize, rest: &[Datum]) -> Result<Value> {
        let mut xform = Transform::IDENTITY;
        for item in rest {
            let factor = match item {
                Datum::List(f) => f,
                _ => return Err(err(line, "xform factors must be lists")),
            };
            let name = factor
                .items
                .first()
                .and_then(Datum::as_name)
                .ok_or_else(|| err(factor.line, "xform factor must start with a name"))?;
            let mut args = self.eval_args(factor.line, &factor.items[1..])?;
            xform = xform
                * match name {
                    "translate" => Transform::translate(take_vec3(&mut args, factor.line)?),
                    "scale" => {
                        Transform::scale(Vec3::splat(take_number(&mut args, factor.line)? as f32))
                    }
                    "rotate" => {
                        let degrees = take_number(&mut args, factor.line)? as f32;
                        let axis = take_vec3(&mut args, factor.line)?;
                        if axis.length_squared() == 0.0 {
                            return Err(Error::Config(format!(
                                "line {}: rotate axis must be non-zero",
                                factor.line
                            )));
                        }
                        Transform::rotate(degrees, axis)
                    }
                    other => {
                        return Err(err(factor.line, &format!("unknown transform {other:?}")))
                    }
                };
        }
        Ok(Value::Xform(xform))
    }

    fn eval_shape(&self, line: usize, rest: &[Datum]) -> Result<Value> {
        let kind = rest
            .first()
            .and_then(Datum::as_name)
            .ok_or_else(|| err(line, "shape needs a kind name"))?;
        let mut args = self.eval_args(line, &rest[1..])?;

        let shape = match kind {
            "sphere" => Shape::Sphere,
            "plane" => Shape::Plane,
            "disk" => Shape::Disk,
            "rectangle" => Shape::Rectangle,
            "box" => Shape::Cube,
            "triangle" => {
                let v0 = take_vec3(&mut args, line)?;
                let v1 = take_vec3(&mut args, line)?;
                let v2 = take_vec3(&mut args, line)?;
                Shape::Triangle { v: [v0, v1, v2] }
            }
            "direct_mesh" => {
                let mut vertices = Vec::new();
                while args.iter().any(is_vec3) {
                    vertices.push(take_vec3(&mut args, line)?);
                }
                if vertices.is_empty() || vertices.len() % 3 != 0 {
                    return Err(err(line, "direct_mesh needs vertices in triples"));
                }
                let indices = (0..vertices.len() as u32).collect();
                Shape::Mesh(MeshBuilder::new(vertices, indices).build()?)
            }
            "ply_mesh" => {
                let file = take_string(&mut args, line)?;
                let mut builder = MeshBuilder::load_ply(&self.dir.join(file))?;
                if let Some(mut a) = take_attr(&mut args, "smooth") {
                    builder = builder.smooth(take_number(&mut a.values, a.line)? != 0.0);
                }
                if let Some(mut a) = take_attr(&mut args, "floor") {
                    builder = builder.floor(take_number(&mut a.values, a.line)? as f32);
                }
                if let Some(mut a) = take_attr(&mut args, "height") {
                    builder = builder.height(take_number(&mut a.values, a.line)? as f32);
                }
                Shape::Mesh(builder.build()?)
            }
            other => return Err(err(line, &format!("unknown shape {other:?}"))),
        };
        Ok(Value::Shape(Arc::new(shape)))
    }

    fn eval_texture(&self, line: usize, rest: &[Datum]) -> Result<Value> {
        let kind = rest
            .first()
            .and_then(Datum::as_name)
            .ok_or_else(|| err(line, "texture needs a kind name"))?;
        let mut args = self.eval_args(line, &rest[1..])?;

        let texture = match kind {
            "solid" => Texture::Solid(take_spectrum(&mut args, line)?),
            "checker" => Texture::Checker {
                a: take_spectrum(&mut args, line)?,
                b: take_spectrum(&mut args, line)?,
            },
            "grid" => Texture::Grid {
                width: take_number(&mut args, line)? as f32,
                a: take_spectrum(&mut args, line)?,
                b: take_spectrum(&mut args, line)?,
            },
            other => return Err(err(line, &format!("unknown texture {other:?}"))),
        };
        Ok(Value::Texture(texture))
    }

    fn eval_material(&self, line: usize, rest: &[Datum]) -> Result<Value> {
        let kind = rest
            .first()
            .and_then(Datum::as_name)
            .ok_or_else(|| err(line, "material needs a kind name"))?;
        let mut args = self.eval_args(line, &rest[1..])?;

        let material = match kind {
            "diffuse" => Material::Diffuse {
                reflectance: take_texture(&mut args, line)?,
                tex_xform: take_xforms(&mut args),
            },
            "diffuse2" => Material::RoughDiffuse {
                reflectance: take_texture(&mut args, line)?,
                sigma: take_texture(&mut args, line)?,
                tex_xform: take_xforms(&mut args),
            },
            "mirror" => Material::Mirror {
                reflectance: take_spectrum(&mut args, line)?,
            },
            "metal" => Material::Metal {
                eta: take_spectrum(&mut args, line)?,
                k: take_spectrum(&mut args, line)?,
            },
            "glass" => {
                let reflectance = take_spectrum(&mut args, line)?;
                let ior = match take_number(&mut args, line) {
                    Ok(n) => n as f32,
                    Err(_) => GLASS_IOR,
                };
                Material::Glass { reflectance, ior }
            }
            other => return Err(err(line, &format!("unknown material {other:?}"))),
        };
        Ok(Value::Material(Arc::new(material)))
    }

    /// `(prim (material ...) (shape ...) (xform ...) [(emit <L>)])`.
    fn eval_prim(&self, line: usize, rest: &[Datum]) -> Result<Value> {
        let mut args = self.eval_args(line, rest)?;

        let material = take_material(&mut args, line)?;
        let shape = take_shape(&mut args, line)?;
        let world_from_prim = take_xforms(&mut args);
        let le = match take_attr(&mut args, "emit") {
            Some(mut a) => take_spectrum(&mut a.values, a.line)?,
            None => Spectrum::ZERO,
        };

        Ok(Value::Prim(GeometricPrimitive {
            shape,
            material,
            world_from_prim,
            le,
        }))
    }

    fn eval_camera(&self, line: usize, rest: &[Datum]) -> Result<Value> {
        let kind = rest
            .first()
            .and_then(Datum::as_name)
            .ok_or_else(|| err(line, "camera needs a kind name"))?;
        let mut args = self.eval_args(line, &rest[1..])?;

        let mut camera = match kind {
            "pinhole" => {
                let fov = take_attr_number(&mut args, "fov", 60.0)?;
                Camera::pinhole(fov as f32)
            }
            "thinlens" => {
                let focal = take_attr_number(&mut args, "focal_length", 55.0)?;
                let focus = take_attr_number(&mut args, "focus_distance", 10.0)?;
                let f_number = take_attr_number(&mut args, "f_number", 5.6)?;
                Camera::thin_lens(focal as f32, focus as f32, f_number as f32)
            }
            other => return Err(err(line, &format!("unknown camera {other:?}"))),
        };

        camera.set_xform(take_xforms(&mut args));
        if let Some(mut a) = take_attr(&mut args, "size") {
            let size = take_vec2(&mut a.values, a.line)?;
            camera.set_film(size.x, size.y);
        }
        Ok(Value::Camera(camera))
    }

    fn eval_skylight(&self, line: usize, rest: &[Datum]) -> Result<Value> {
        let kind = rest
            .first()
            .and_then(Datum::as_name)
            .ok_or_else(|| err(line, "skylight needs a kind name"))?;
        let mut args = self.eval_args(line, &rest[1..])?;

        let radiance = |args: &mut Vec<Arg>| -> Result<Spectrum> {
            match take_attr(args, "R") {
                Some(mut a) => take_spectrum(&mut a.values, a.line),
                None => Err(err(line, "skylight needs an (R <r>) attribute")),
            }
        };

        let skylight = match kind {
            "solid" => Skylight::Solid(radiance(&mut args)?),
            "cosine" => Skylight::Cosine(radiance(&mut args)?),
            "color" => Skylight::Directions,
            "probe" => {
                let mut a = take_attr(&mut args, "file")
                    .ok_or_else(|| err(line, "probe skylight needs a (file ...) attribute"))?;
                let file = take_string(&mut a.values, a.line)?;
                Skylight::probe(&self.dir.join(file))?
            }
            other => return Err(err(line, &format!("unknown skylight {other:?}"))),
        };
        Ok(Value::Skylight(skylight))
    }

    /// Evaluate the raw arguments of a form: atoms and known sub-forms
    /// become values, any other list becomes a named attribute.
    fn eval_args(&self, line: usize, items: &[Datum]) -> Result<Vec<Arg>> {
        let mut args = Vec::with_capacity(items.len());
        for item in items {
            args.push(match item {
                Datum::Number(n) => Arg::Value(Value::Number(*n)),
                Datum::Str(s) => Arg::Value(Value::Str(s.clone())),
                Datum::Name(n) => Arg::Value(Value::Str(n.clone())),
                Datum::List(form) => {
                    let head = form
                        .items
                        .first()
                        .and_then(Datum::as_name)
                        .ok_or_else(|| err(line, "list argument must start with a name"))?;
                    if FORM_HEADS.contains(&head) {
                        Arg::Value(self.eval_form(form)?)
                    } else {
                        Arg::Attr(Attr {
                            name: head.to_string(),
                            line: form.line,
                            values: self.eval_args(form.line, &form.items[1..])?,
                        })
                    }
                }
            });
        }
        Ok(args)
    }
}

fn err(line: usize, msg: &str) -> Error {
    Error::Scene(format!("line {line}: {msg}"))
}

fn is_vec3(arg: &Arg) -> bool {
    matches!(arg, Arg::Value(Value::Vec3(_)))
}

fn take_attr(args: &mut Vec<Arg>, name: &str) -> Option<Attr> {
    let pos = args
        .iter()
        .position(|a| matches!(a, Arg::Attr(attr) if attr.name == name))?;
    match args.remove(pos) {
        Arg::Attr(attr) => Some(attr),
        Arg::Value(_) => unreachable!(),
    }
}

fn take_attr_number(args: &mut Vec<Arg>, name: &str, default: f64) -> Result<f64> {
    match take_attr(args, name) {
        Some(mut a) => take_number(&mut a.values, a.line),
        None => Ok(default),
    }
}

/// Compose every xform argument of the form, left to right.
fn take_xforms(args: &mut Vec<Arg>) -> Transform {
    let mut xform = Transform::IDENTITY;
    args.retain(|a| match a {
        Arg::Value(Value::Xform(t)) => {
            xform = xform * *t;
            false
        }
        _ => true,
    });
    xform
}

/// Pop the first value matching `pick`, or fail with the expectation name.
fn take_value<T>(
    args: &mut Vec<Arg>,
    line: usize,
    what: &str,
    pick: impl Fn(&Value) -> Option<T>,
) -> Result<T> {
    let pos = args
        .iter()
        .position(|a| matches!(a, Arg::Value(v) if pick(v).is_some()))
        .ok_or_else(|| err(line, &format!("expected a {what} argument")))?;
    match args.remove(pos) {
        Arg::Value(v) => pick(&v).ok_or_else(|| err(line, &format!("expected a {what} argument"))),
        Arg::Attr(_) => unreachable!(),
    }
}

fn take_number(args: &mut Vec<Arg>, line: usize) -> Result<f64> {
    take_value(args, line, "number", |v| match v {
        Value::Number(n) => Some(*n),
        _ => None,
    })
}

fn take_string(args: &mut Vec<Arg>, line: usize) -> Result<String> {
    take_value(args, line, "string", |v| match v {
        Value::Str(s) => Some(s.clone()),
        _ => None,
    })
}

fn take_vec2(args: &mut Vec<Arg>, line: usize) -> Result<Vec2> {
    take_value(args, line, "vec2", |v| match v {
        Value::Vec2(x) => Some(*x),
        _ => None,
    })
}

fn take_vec3(args: &mut Vec<Arg>, line: usize) -> Result<Vec3> {
    take_value(args, line, "vec3", |v| match v {
        Value::Vec3(x) => Some(*x),
        _ => None,
    })
}

/// A spectrum argument: a vec3/rgb value, or a bare number splat.
fn take_spectrum(args: &mut Vec<Arg>, line: usize) -> Result<Spectrum> {
    take_value(args, line, "color", |v| match v {
        Value::Vec3(x) => Some(*x),
        Value::Number(n) => Some(Spectrum::splat(*n as f32)),
        _ => None,
    })
}

/// A texture argument; a bare color is promoted to a solid texture.
fn take_texture(args: &mut Vec<Arg>, line: usize) -> Result<Texture> {
    take_value(args, line, "texture or color", |v| match v {
        Value::Texture(t) => Some(*t),
        Value::Vec3(x) => Some(Texture::Solid(*x)),
        Value::Number(n) => Some(Texture::Solid(Spectrum::splat(*n as f32))),
        _ => None,
    })
}

fn take_material(args: &mut Vec<Arg>, line: usize) -> Result<Arc<Material>> {
    take_value(args, line, "material", |v| match v {
        Value::Material(m) => Some(Arc::clone(m)),
        _ => None,
    })
}

fn take_shape(args: &mut Vec<Arg>, line: usize) -> Result<Arc<Shape>> {
    take_value(args, line, "shape", |v| match v {
        Value::Shape(s) => Some(Arc::clone(s)),
        _ => None,
    })
}
