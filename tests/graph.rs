use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;

use framegraph::prelude::*;

mod framework;

use framework::{dispatch_pass, init_logging, MockAllocator};

fn texture(id: u64) -> PhysicalResource {
    PhysicalResource::Texture(TextureId(id))
}

#[test]
fn producer_runs_before_consumer_registered_earlier() -> Result<()> {
    init_logging();
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    let gbuffer = graph.create_transient("gbuffer", TextureDescription::new_2d(64, 64, Format::Rgba8Unorm));

    graph.add_pass(dispatch_pass("lighting").consume(gbuffer, AccessMode::SampledRead).build())?;
    graph.add_pass(dispatch_pass("unrelated").build())?;
    graph.add_pass(dispatch_pass("geometry").produce(gbuffer, AccessMode::StorageWrite).build())?;

    let compiled = graph.compile(&mut ctx, &mut MockAllocator::new())?;
    let order = compiled.pass_names().collect::<Vec<_>>();
    let position = |name: &str| order.iter().position(|pass| *pass == name).unwrap();
    assert!(position("geometry") < position("lighting"));
    assert_eq!(order, ["unrelated", "geometry", "lighting"]);
    Ok(())
}

#[test]
fn independent_passes_keep_registration_order() -> Result<()> {
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    for name in ["c", "a", "b"] {
        graph.add_pass(dispatch_pass(name).build())?;
    }
    let compiled = graph.compile(&mut ctx, &mut MockAllocator::new())?;
    assert_eq!(compiled.pass_names().collect::<Vec<_>>(), ["c", "a", "b"]);
    assert_eq!(compiled.order(), [0, 1, 2]);
    Ok(())
}

#[test]
fn attachment_write_then_sampled_read() -> Result<()> {
    init_logging();
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    let t = graph.create_transient("T", TextureDescription::new_2d(128, 128, Format::Rgba16Float));

    graph.add_pass(
        PassBuilder::graphics("P1")
            .clear_color_attachment(t, ClearColor::Float([0.0; 4]))?
            .produce(t, AccessMode::AttachmentWrite)
            .build(),
    )?;
    graph.add_pass(dispatch_pass("P2").consume(t, AccessMode::SampledRead).build())?;

    let compiled = graph.compile(&mut ctx, &mut MockAllocator::new())?;
    assert_eq!(compiled.pass_names().collect::<Vec<_>>(), ["P1", "P2"]);
    assert!(compiled.barriers(0).is_empty());
    assert_eq!(
        compiled.barriers(1),
        [PassResourceBarrier {
            resource: t,
            from: AccessMode::AttachmentWrite,
            to: AccessMode::SampledRead,
        }]
    );
    assert_eq!(compiled.num_barriers(), 1);
    Ok(())
}

#[test]
fn repeated_writes_are_ordered_and_synchronized() -> Result<()> {
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    let b = graph.create_transient("B", BufferDescription { size: 1024 });
    for name in ["P1", "P2", "P3"] {
        graph.add_pass(dispatch_pass(name).produce(b, AccessMode::StorageWrite).build())?;
    }

    let compiled = graph.compile(&mut ctx, &mut MockAllocator::new())?;
    assert_eq!(compiled.pass_names().collect::<Vec<_>>(), ["P1", "P2", "P3"]);
    let write = PassResourceBarrier {
        resource: b,
        from: AccessMode::StorageWrite,
        to: AccessMode::StorageWrite,
    };
    assert!(compiled.barriers(0).is_empty());
    assert_eq!(compiled.barriers(1), [write]);
    assert_eq!(compiled.barriers(2), [write]);
    Ok(())
}

#[test]
fn identical_reads_share_state() -> Result<()> {
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    let env = graph.import("environment", texture(1), AccessMode::SampledRead);
    for name in ["sky", "reflections", "ambient"] {
        graph.add_pass(dispatch_pass(name).consume(env, AccessMode::SampledRead).build())?;
    }
    let compiled = graph.compile(&mut ctx, &mut MockAllocator::new())?;
    assert_eq!(compiled.num_barriers(), 0);
    Ok(())
}

#[test]
fn barrier_count_is_bounded_by_accesses() -> Result<()> {
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    let hdr = graph.import("hdr", texture(2), AccessMode::AttachmentWrite);
    let modes = [
        AccessMode::StorageReadWrite,
        AccessMode::SampledRead,
        AccessMode::SampledRead,
        AccessMode::TransferSource,
        AccessMode::TransferSource,
    ];
    for (i, mode) in modes.iter().enumerate() {
        let pass = dispatch_pass(&format!("pass{i}"));
        let pass = if mode.is_write() {
            pass.produce(hdr, *mode)
        } else {
            pass.consume(hdr, *mode)
        };
        graph.add_pass(pass.build())?;
    }
    let compiled = graph.compile(&mut ctx, &mut MockAllocator::new())?;
    let barriers = (0..compiled.num_passes())
        .flat_map(|i| compiled.barriers(i).iter().copied())
        .collect::<Vec<_>>();
    assert!(barriers.len() <= modes.len());
    // Every change involving a write is covered.
    assert_eq!(
        barriers.iter().map(|b| (b.from, b.to)).collect::<Vec<_>>(),
        [
            (AccessMode::AttachmentWrite, AccessMode::StorageReadWrite),
            (AccessMode::StorageReadWrite, AccessMode::SampledRead),
            (AccessMode::SampledRead, AccessMode::TransferSource),
        ]
    );
    Ok(())
}

#[test]
fn cycle_is_rejected_without_recording() -> Result<()> {
    init_logging();
    let recorded = AtomicUsize::new(0);
    let recorded = &recorded;
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    let r1 = graph.create_transient("R1", BufferDescription { size: 16 });
    let r2 = graph.create_transient("R2", BufferDescription { size: 16 });

    graph.add_pass(
        PassBuilder::compute("A")
            .consume(r1, AccessMode::StorageRead)
            .produce(r2, AccessMode::StorageWrite)
            .execute_fn(move |cmd, _, _| {
                recorded.fetch_add(1, Ordering::SeqCst);
                Ok(cmd)
            })
            .build(),
    )?;
    graph.add_pass(
        PassBuilder::compute("B")
            .consume(r2, AccessMode::StorageRead)
            .produce(r1, AccessMode::StorageWrite)
            .execute_fn(move |cmd, _, _| {
                recorded.fetch_add(1, Ordering::SeqCst);
                Ok(cmd)
            })
            .build(),
    )?;

    let mut allocator = MockAllocator::new();
    let err = graph.compile(&mut ctx, &mut allocator).unwrap_err();
    match err.downcast_ref::<Error>() {
        Some(Error::CyclicDependency {
            first,
            second,
        }) => {
            let mut pair = [first.as_str(), second.as_str()];
            pair.sort();
            assert_eq!(pair, ["A", "B"]);
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
    assert_eq!(recorded.load(Ordering::SeqCst), 0);
    assert!(allocator.allocations.is_empty());
    Ok(())
}

fn build_frame(ctx: &mut GraphContext) -> Result<CompiledGraph<'static, ()>> {
    let mut graph = ctx.begin_frame::<()>();
    let depth = graph.create_transient("depth", TextureDescription::new_2d(32, 32, Format::Depth32Float));
    let color = graph.create_transient("color", TextureDescription::new_2d(32, 32, Format::Rgba8Unorm));
    let target = graph.import_texture("swapchain", TextureId(9), 32, 32, AccessMode::None);

    graph.add_pass(
        PassBuilder::graphics("depth_prepass")
            .clear_depth_attachment(depth, ClearDepthStencil { depth: 1.0, stencil: 0 })?
            .produce(depth, AccessMode::AttachmentWrite)
            .build(),
    )?;
    graph.add_pass(
        PassBuilder::graphics("forward")
            .depth_attachment(depth, LoadOp::Load, StoreOp::DontCare)?
            .clear_color_attachment(color, ClearColor::Float([0.0; 4]))?
            .consume(depth, AccessMode::AttachmentRead)
            .produce(color, AccessMode::AttachmentWrite)
            .build(),
    )?;
    graph.add_pass(dispatch_pass("bloom").consume(color, AccessMode::SampledRead).build())?;
    graph.add_pass(
        PassBuilder::graphics("tonemap")
            .load_color_attachment(target)?
            .consume(color, AccessMode::SampledRead)
            .produce(target, AccessMode::AttachmentWrite)
            .build(),
    )?;
    graph.add_pass(PassBuilder::graphics("present").consume(target, AccessMode::Present).build())?;
    graph.compile(ctx, &mut MockAllocator::new())
}

#[test]
fn ordering_is_deterministic_across_frames() -> Result<()> {
    let mut ctx = GraphContext::default();
    let first = build_frame(&mut ctx)?;
    let second = build_frame(&mut ctx)?;

    assert_eq!(first.order(), second.order());
    assert_eq!(first.pass_names().collect::<Vec<_>>(), second.pass_names().collect::<Vec<_>>());
    for i in 0..first.num_passes() {
        let strip = |barriers: &[PassResourceBarrier]| {
            barriers
                .iter()
                .map(|b| (b.resource.index(), b.from, b.to))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(first.barriers(i)), strip(second.barriers(i)));
    }
    Ok(())
}

#[test]
fn pass_may_read_and_write_the_same_resource() -> Result<()> {
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    let chain = graph.create_transient("mip_chain", TextureDescription::new_2d(256, 256, Format::Rgba16Float));

    graph.add_pass(dispatch_pass("seed").produce(chain, AccessMode::StorageWrite).build())?;
    graph.add_pass(
        PassBuilder::graphics("downsample")
            .load_color_attachment(chain)?
            .consume(chain, AccessMode::SampledRead)
            .produce(chain, AccessMode::AttachmentWrite)
            .build(),
    )?;
    graph.add_pass(dispatch_pass("composite").consume(chain, AccessMode::SampledRead).build())?;

    let compiled = graph.compile(&mut ctx, &mut MockAllocator::new())?;
    assert_eq!(compiled.pass_names().collect::<Vec<_>>(), ["seed", "downsample", "composite"]);
    assert_eq!(
        compiled.barriers(1),
        [PassResourceBarrier {
            resource: chain,
            from: AccessMode::StorageWrite,
            to: AccessMode::AttachmentWrite,
        }]
    );
    assert_eq!(
        compiled.barriers(2),
        [PassResourceBarrier {
            resource: chain,
            from: AccessMode::AttachmentWrite,
            to: AccessMode::SampledRead,
        }]
    );
    Ok(())
}

#[test]
fn handles_do_not_cross_frames() -> Result<()> {
    let mut ctx = GraphContext::default();
    let mut old = ctx.begin_frame::<()>();
    let stale = old.import("shadow_map", texture(4), AccessMode::None);
    drop(old);

    let mut graph = ctx.begin_frame::<()>();
    let err = graph
        .add_pass(dispatch_pass("shadows").consume(stale, AccessMode::SampledRead).build())
        .unwrap_err();
    assert_eq!(err.downcast_ref::<Error>(), Some(&Error::InvalidHandle(stale)));
    assert!(graph.resources().resolve(stale).is_err());
    Ok(())
}

#[test]
fn conflicting_modes_in_one_pass_are_rejected() -> Result<()> {
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    let buf = graph.create_transient("lights", BufferDescription { size: 512 });
    let err = graph
        .add_pass(
            dispatch_pass("cull")
                .consume(buf, AccessMode::StorageRead)
                .consume(buf, AccessMode::TransferSource)
                .build(),
        )
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<Error>(),
        Some(&Error::AmbiguousAccess {
            pass: "cull".to_owned(),
            resource: "lights".to_owned(),
        })
    );
    assert_eq!(graph.num_passes(), 0);
    Ok(())
}

#[test]
fn written_attachment_needs_producer() -> Result<()> {
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    let target = graph.create_transient("target", TextureDescription::new_2d(8, 8, Format::Rgba8Unorm));
    let err = graph
        .add_pass(PassBuilder::graphics("draw").load_color_attachment(target)?.build())
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<Error>(),
        Some(&Error::MissingProducer {
            pass: "draw".to_owned(),
            resource: "target".to_owned(),
        })
    );
    Ok(())
}

#[test]
fn attachment_without_known_size_needs_render_area() -> Result<()> {
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    let backbuffer = graph.import("backbuffer", texture(1), AccessMode::None);
    let depth = graph.import("depth", texture(2), AccessMode::None);

    let err = graph
        .add_pass(
            PassBuilder::graphics("blit")
                .clear_color_attachment(backbuffer, ClearColor::Float([0.0; 4]))?
                .produce(backbuffer, AccessMode::AttachmentWrite)
                .build(),
        )
        .unwrap_err();
    assert_eq!(err.downcast_ref::<Error>(), Some(&Error::UnknownRenderArea("blit".to_owned())));

    let err = graph
        .add_pass(
            PassBuilder::graphics("shadows")
                .clear_depth_attachment(depth, ClearDepthStencil { depth: 1.0, stencil: 0 })?
                .produce(depth, AccessMode::AttachmentWrite)
                .build(),
        )
        .unwrap_err();
    assert_eq!(err.downcast_ref::<Error>(), Some(&Error::UnknownRenderArea("shadows".to_owned())));
    assert_eq!(graph.num_passes(), 0);

    graph.add_pass(
        PassBuilder::graphics("blit")
            .clear_color_attachment(backbuffer, ClearColor::Float([0.0; 4]))?
            .depth_attachment(depth, LoadOp::Load, StoreOp::DontCare)?
            .render_area(Rect2D {
                x: 0,
                y: 0,
                width: 640,
                height: 360,
            })?
            .produce(backbuffer, AccessMode::AttachmentWrite)
            .consume(depth, AccessMode::AttachmentRead)
            .build(),
    )?;
    assert_eq!(graph.num_passes(), 1);
    Ok(())
}

#[test]
fn writing_consumers_keep_registration_order() -> Result<()> {
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    let t = graph.create_transient("T", BufferDescription { size: 64 });
    let r = graph.create_transient("R", BufferDescription { size: 64 });

    graph.add_pass(
        dispatch_pass("A")
            .consume(t, AccessMode::StorageWrite)
            .consume(r, AccessMode::StorageRead)
            .build(),
    )?;
    graph.add_pass(dispatch_pass("B").consume(t, AccessMode::StorageWrite).build())?;
    graph.add_pass(dispatch_pass("C").produce(r, AccessMode::StorageWrite).build())?;

    let compiled = graph.compile(&mut ctx, &mut MockAllocator::new())?;
    assert_eq!(compiled.pass_names().collect::<Vec<_>>(), ["C", "A", "B"]);
    assert_eq!(
        compiled.barriers(2),
        [PassResourceBarrier {
            resource: t,
            from: AccessMode::StorageWrite,
            to: AccessMode::StorageWrite,
        }]
    );
    Ok(())
}

#[test]
fn graph_of_another_frame_is_rejected() -> Result<()> {
    let mut ctx = GraphContext::default();
    let graph = ctx.begin_frame::<()>();
    let _newer = ctx.begin_frame::<()>();
    let err = graph.compile(&mut ctx, &mut MockAllocator::new()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<Error>(),
        Some(&Error::FrameMismatch {
            expected: 2,
            found: 1,
        })
    );
    Ok(())
}

#[test]
fn graphviz_output() -> Result<()> {
    let mut ctx = GraphContext::default();
    let mut graph = ctx.begin_frame::<()>();
    let ao = graph.create_transient("ssao", TextureDescription::new_2d(16, 16, Format::R8Unorm));
    graph.add_pass(dispatch_pass("ssao_main").produce(ao, AccessMode::StorageWrite).build())?;
    graph.add_pass(dispatch_pass("ssao_blur").consume(ao, AccessMode::SampledRead).build())?;
    let dot = graph.dot()?;
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("ssao_main"));
    assert!(dot.contains("ssao_blur"));
    assert!(dot.contains("->"));
    Ok(())
}
